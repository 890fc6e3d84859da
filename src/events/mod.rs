//! Event and log records shared by the watcher, processor, and sinks
//!
//! - [`event`]: [`NormalizedEvent`], the owned snapshot of a cluster event
//! - [`bundle`]: [`ContainerLogBundle`], per-container logs for one event
//!
//! Both types are plain values. They are created once, moved through the
//! pipeline by ownership transfer, and dropped after the notification sink
//! has seen them.

pub mod bundle;
pub mod event;

pub use bundle::{ContainerLog, ContainerLogBundle};
pub use event::{EventMetadata, EventSourceInfo, EventType, InvolvedObject, NormalizedEvent};
