//! Capability traits over the cluster API.
//!
//! The watcher and the log fetcher depend on these traits rather than on a
//! concrete client, so tests can drive them with scripted fakes. The
//! production implementation is [`super::KubeClient`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Event;
use thiserror::Error;

use crate::logs::TailLines;

/// One item of a watch session.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchItem {
    /// An event object was added, modified or deleted
    Event(Box<Event>),
    /// The server has sent everything up to this resource version
    Bookmark(String),
}

/// Stream of watch items for one watch session.
///
/// The stream ends when the server closes the session (normally on its
/// configured timeout). Errors are yielded in-band.
pub type RawEventStream = BoxStream<'static, Result<WatchItem, ClientError>>;

/// Errors returned by cluster client operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The requested object (pod, container instance) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API server answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API server
        message: String,
    },

    /// Connection, TLS, or stream decoding failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials or client configuration could not be loaded.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true for the upstream "not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Returns true when the requested resource version is too old to
    /// resume from (HTTP 410 Gone).
    pub fn is_gone(&self) -> bool {
        matches!(self, ClientError::Api { status: 410, .. })
    }

    /// Maps an API error status to a client error.
    ///
    /// 404 is "not found". When reading the previous container instance, the
    /// API server reports a missing terminated instance as a 400 whose message
    /// ends in "not found"; that is the same condition and maps the same way.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::cluster::ClientError;
    ///
    /// let err = ClientError::from_status(404, "pods \"web-0\" not found", false);
    /// assert!(err.is_not_found());
    ///
    /// let err = ClientError::from_status(
    ///     400,
    ///     "previous terminated container \"app\" in pod \"web-0\" not found",
    ///     true,
    /// );
    /// assert!(err.is_not_found());
    ///
    /// let err = ClientError::from_status(500, "etcdserver: request timed out", true);
    /// assert!(!err.is_not_found());
    /// ```
    pub fn from_status(status: u16, message: &str, previous: bool) -> Self {
        let previous_missing = previous && status == 400 && message.contains("not found");
        if status == 404 || previous_missing {
            ClientError::NotFound(message.to_string())
        } else {
            ClientError::Api {
                status,
                message: message.to_string(),
            }
        }
    }
}

/// Opens watch sessions over all cluster events.
///
/// Each call opens a fresh session. Passing the last resource version seen
/// by a previous session resumes from there instead of replaying every
/// stored event.
#[async_trait]
pub trait EventWatchClient: Send + Sync {
    /// Opens a watch over events in all namespaces.
    ///
    /// # Arguments
    ///
    /// * `timeout_secs` - Server-side session timeout
    /// * `resource_version` - Version to start from; `"0"` replays the
    ///   server's current state
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` or `ClientError::Transport` when the
    /// session cannot be opened. A version the server no longer holds is
    /// reported as `ClientError::Api` with status 410.
    async fn stream_events(
        &self,
        timeout_secs: u32,
        resource_version: &str,
    ) -> Result<RawEventStream, ClientError>;
}

/// Reads pod container lists and container logs.
///
/// Every call is an independent request/response exchange.
#[async_trait]
pub trait PodLogClient: Send + Sync {
    /// Reads the tail of a container's log.
    ///
    /// # Arguments
    ///
    /// * `pod` - Pod name
    /// * `namespace` - Pod namespace
    /// * `container` - Container name
    /// * `tail_lines` - Number of trailing lines to return
    /// * `previous` - Read the previous terminated instance instead of the current one
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` when the pod or requested instance
    /// does not exist, and other variants for genuine failures.
    async fn read_container_log(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        tail_lines: TailLines,
        previous: bool,
    ) -> Result<String, ClientError>;

    /// Lists the pod's container names: init containers first, then
    /// regular containers, each in spec order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` when the pod no longer exists.
    async fn list_pod_containers(
        &self,
        pod: &str,
        namespace: &str,
    ) -> Result<Vec<String>, ClientError>;
}
