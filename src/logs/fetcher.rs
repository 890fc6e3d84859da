//! Per-event container log retrieval
//!
//! [`LogFetcher`] turns one normalized event into a [`ContainerLogBundle`]
//! holding a log tail for every container of the involved pod. For each
//! container it picks a source through [`RetrievalPolicy`]:
//!
//! 1. previous instance first when the policy says so, falling back to the
//!    current instance when no previous instance exists
//! 2. otherwise the current instance only
//!
//! A container whose logs are not found anywhere is recorded with no text.
//! Genuine API failures are reported through [`LogFetchError`].

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::policy::RetrievalPolicy;
use super::tail::TailLines;
use crate::cluster::{ClientError, PodLogClient};
use crate::events::{ContainerLogBundle, NormalizedEvent};
use crate::metrics::{LogReadTimer, LogSource};

/// A container whose log read failed for a reason other than "not found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerFailure {
    /// Container name
    pub container: String,
    /// Error returned by the cluster client
    pub error: ClientError,
}

/// Errors returned by [`LogFetcher`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogFetchError {
    /// The pod's container list could not be read.
    #[error("Failed to list pod containers: {0}")]
    Pod(ClientError),

    /// Some containers failed; the bundle holds every container, with no
    /// text for the failed ones.
    #[error("Log retrieval failed for {} of {} containers", .failures.len(), .bundle.len())]
    Partial {
        /// Bundle with every container of the pod
        bundle: ContainerLogBundle,
        /// Containers whose reads failed
        failures: Vec<ContainerFailure>,
    },
}

impl LogFetchError {
    /// Consumes the error and returns whatever logs were collected.
    ///
    /// `Partial` yields its bundle, `Pod` yields an empty bundle.
    pub fn into_bundle(self) -> ContainerLogBundle {
        match self {
            LogFetchError::Partial { bundle, .. } => bundle,
            LogFetchError::Pod(_) => ContainerLogBundle::new(),
        }
    }
}

/// Fetches container logs for events that involve a pod.
///
/// Holds its own client handle; nothing is shared with the watcher. Every
/// call is independent, so fetching the same event twice against an
/// unchanged cluster yields equal bundles.
#[derive(Clone)]
pub struct LogFetcher {
    client: Arc<dyn PodLogClient>,
    policy: RetrievalPolicy,
    tail_lines: TailLines,
}

impl LogFetcher {
    /// Creates a fetcher.
    ///
    /// # Arguments
    ///
    /// * `client` - Cluster client used for container listing and log reads
    /// * `policy` - Previous-vs-current decision
    /// * `tail_lines` - Default tail used by [`LogFetcher::fetch`]
    pub fn new(client: Arc<dyn PodLogClient>, policy: RetrievalPolicy, tail_lines: TailLines) -> Self {
        Self {
            client,
            policy,
            tail_lines,
        }
    }

    /// The default tail-line count.
    pub fn tail_lines(&self) -> TailLines {
        self.tail_lines
    }

    /// Fetches logs for every container of the event's pod using the
    /// configured tail.
    ///
    /// # Errors
    ///
    /// See [`LogFetcher::fetch_with_tail`].
    pub async fn fetch(&self, event: &NormalizedEvent) -> Result<ContainerLogBundle, LogFetchError> {
        self.fetch_with_tail(event, self.tail_lines).await
    }

    /// Fetches logs for every container of the event's pod.
    ///
    /// Returns an empty bundle when the pod no longer exists or declares no
    /// containers. Container entries keep the pod spec order.
    ///
    /// # Errors
    ///
    /// Returns `LogFetchError::Pod` when listing the containers fails, and
    /// `LogFetchError::Partial` when at least one container read failed with
    /// something other than "not found". The remaining containers are still
    /// read in the latter case.
    pub async fn fetch_with_tail(
        &self,
        event: &NormalizedEvent,
        tail_lines: TailLines,
    ) -> Result<ContainerLogBundle, LogFetchError> {
        let pod = event.involved_object.name.as_str();
        let namespace = event.involved_object.namespace.as_str();

        let containers = match self.client.list_pod_containers(pod, namespace).await {
            Ok(containers) => containers,
            Err(e) if e.is_not_found() => {
                debug!(namespace, pod, "Pod no longer exists, no logs to fetch");
                return Ok(ContainerLogBundle::new());
            }
            Err(e) => return Err(LogFetchError::Pod(e)),
        };

        let previous = self.policy.fetch_previous(event);
        debug!(
            namespace,
            pod,
            reason = %event.reason,
            previous,
            containers = containers.len(),
            "Fetching container logs"
        );

        let mut bundle = ContainerLogBundle::new();
        let mut failures = Vec::new();

        for container in containers {
            match self
                .fetch_container(pod, namespace, &container, tail_lines, previous)
                .await
            {
                Ok(logs) => bundle.push(container, logs),
                Err(error) => {
                    warn!(
                        namespace,
                        pod,
                        container = %container,
                        error = %error,
                        "Failed to read container logs"
                    );
                    bundle.push(container.clone(), None);
                    failures.push(ContainerFailure { container, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(bundle)
        } else {
            Err(LogFetchError::Partial { bundle, failures })
        }
    }

    async fn fetch_container(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        tail_lines: TailLines,
        previous: bool,
    ) -> Result<Option<String>, ClientError> {
        if previous {
            match self.read(pod, namespace, container, tail_lines, true).await {
                Ok(text) => return Ok(Some(text)),
                Err(e) if e.is_not_found() => {
                    debug!(
                        namespace,
                        pod, container, "No previous instance, falling back to current logs"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        match self.read(pod, namespace, container, tail_lines, false).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_not_found() => {
                debug!(namespace, pod, container, "No logs found for container");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn read(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        tail_lines: TailLines,
        previous: bool,
    ) -> Result<String, ClientError> {
        let timer = LogReadTimer::start(LogSource::from_previous(previous));
        let result = self
            .client
            .read_container_log(pod, namespace, container, tail_lines, previous)
            .await;

        timer.record(match &result {
            Ok(_) => "found",
            Err(e) if e.is_not_found() => "not_found",
            Err(_) => "error",
        });

        result
    }
}
