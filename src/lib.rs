//! EventLens - Kubernetes failure-event watcher library
//!
//! EventLens watches cluster events, keeps the actionable ones, collects
//! the logs of the affected pod's containers, and hands event and logs to
//! a notification sink.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `cluster`: API client traits and the `kube`-backed implementation
//! - `events`: Normalized event snapshots and container log bundles
//! - `watcher`: Event filter, watch sessions, and the reconnecting watch loop
//! - `queue`: Handoff queue between the watcher and the processor
//! - `logs`: Log retrieval policy and fetcher
//! - `processor`: Consumer loop that fetches logs and notifies
//! - `notify`: Notification sinks (service log, Slack)
//! - `health`: Liveness and readiness probes
//! - `lifecycle`: Cancellable background services
//! - `commands`: CLI command handlers
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use eventlens::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/eventlens.yaml", &Default::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod cluster;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod lifecycle;
pub mod logs;
pub mod metrics;
pub mod notify;
pub mod processor;
pub mod queue;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use error::{EventLensError, Result};
pub use events::{ContainerLogBundle, NormalizedEvent};
pub use processor::Processor;
pub use watcher::EventWatcher;

#[cfg(test)]
pub mod test_utils;
