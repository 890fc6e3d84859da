//! Cluster API access
//!
//! This module provides the capability surface the rest of the crate uses to
//! talk to Kubernetes:
//!
//! - [`EventWatchClient`]: open a watch session over all events
//! - [`PodLogClient`]: list a pod's containers and read container logs
//!
//! [`KubeClient`] implements both on top of the `kube` crate. The watcher
//! and the log fetcher each hold their own handle; no mutable connection
//! state is shared between them.

pub mod client;
pub mod kube_client;

pub use client::{ClientError, EventWatchClient, PodLogClient, RawEventStream, WatchItem};
pub use kube_client::KubeClient;
