//! Event Watch Core
//!
//! This module keeps a continuous view of cluster events despite a finite,
//! lossy underlying watch stream, and forwards the actionable ones to the
//! processor.
//!
//! # Overview
//!
//! The watcher is an autonomous component that:
//! 1. Opens a watch session over events in all namespaces
//! 2. Normalizes each raw event into an owned snapshot
//! 3. Filters events against the configured actionable types
//! 4. Enqueues actionable events on the handoff queue
//! 5. Reconnects on session timeout, or after a backoff on failure
//!
//! # Modules
//!
//! - [`filter`]: Actionable-event classification
//! - [`session`]: A single watch subscription with its deadline
//! - [`watcher`]: The reconnecting watch loop and its state machine
//! - [`logging`]: Structured logging configuration

pub mod filter;
pub mod logging;
pub mod session;
#[allow(clippy::module_inception)]
pub mod watcher;

pub use filter::EventFilter;
pub use logging::init_logging;
pub use session::{SessionItem, WatchSession};
pub use watcher::{EventWatcher, WatchSettings, WatchState, WatchStateHandle};
