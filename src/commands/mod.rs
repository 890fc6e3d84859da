/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `watch`      — Run the watcher service until interrupted
- `fetch_logs` — One-shot log retrieval for a single pod

The handlers only wire library components together; all behaviour lives
in the library modules.
*/

pub mod fetch_logs;
pub mod watch;
