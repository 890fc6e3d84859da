//! Test utilities for EventLens
//!
//! Scripted in-memory implementations of the cluster capability traits,
//! plus builders for raw core/v1 events.

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::cluster::{ClientError, EventWatchClient, PodLogClient, RawEventStream, WatchItem};
use crate::logs::TailLines;

/// Build a raw event about a pod
///
/// # Arguments
///
/// * `event_type` - Event type (`Warning`, `Normal`, ...)
/// * `namespace` - Pod namespace
/// * `pod` - Pod name
/// * `reason` - Event reason
/// * `message` - Event message
pub fn pod_event(event_type: &str, namespace: &str, pod: &str, reason: &str, message: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: Some(format!("{}.{}", pod, reason.to_lowercase())),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some(event_type.to_string()),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(pod.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build a raw `Warning` event about a pod
pub fn warning_event(namespace: &str, pod: &str, reason: &str, message: &str) -> Event {
    pod_event("Warning", namespace, pod, reason, message)
}

/// Stamp an event with the resource version the API server assigned it
pub fn at_version(mut event: Event, resource_version: &str) -> Event {
    event.metadata.resource_version = Some(resource_version.to_string());
    event
}

/// One recorded `read_container_log` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCall {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub tail_lines: u32,
    pub previous: bool,
}

type LogKey = (String, String, String, bool);

/// Scripted pod/log client
///
/// Pods and logs not registered through the builder methods answer with
/// `ClientError::NotFound`. Every log read is recorded.
#[derive(Default)]
pub struct FakePodLogClient {
    pods: HashMap<(String, String), Result<Vec<String>, ClientError>>,
    logs: HashMap<LogKey, Result<String, ClientError>>,
    calls: Mutex<Vec<LogCall>>,
}

impl FakePodLogClient {
    /// Create a client that knows no pods
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pod with its containers
    pub fn with_pod(mut self, namespace: &str, pod: &str, containers: &[&str]) -> Self {
        self.pods.insert(
            (namespace.to_string(), pod.to_string()),
            Ok(containers.iter().map(|c| c.to_string()).collect()),
        );
        self
    }

    /// Make listing the pod's containers fail
    pub fn with_pod_error(mut self, namespace: &str, pod: &str, error: ClientError) -> Self {
        self.pods
            .insert((namespace.to_string(), pod.to_string()), Err(error));
        self
    }

    /// Register log text for one container instance
    pub fn with_log(
        mut self,
        namespace: &str,
        pod: &str,
        container: &str,
        previous: bool,
        text: &str,
    ) -> Self {
        self.logs.insert(
            key(namespace, pod, container, previous),
            Ok(text.to_string()),
        );
        self
    }

    /// Make reading one container instance fail
    pub fn with_log_error(
        mut self,
        namespace: &str,
        pod: &str,
        container: &str,
        previous: bool,
        error: ClientError,
    ) -> Self {
        self.logs
            .insert(key(namespace, pod, container, previous), Err(error));
        self
    }

    /// All recorded log reads, in call order
    pub fn calls(&self) -> Vec<LogCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn key(namespace: &str, pod: &str, container: &str, previous: bool) -> LogKey {
    (
        namespace.to_string(),
        pod.to_string(),
        container.to_string(),
        previous,
    )
}

#[async_trait]
impl PodLogClient for FakePodLogClient {
    async fn read_container_log(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        tail_lines: TailLines,
        previous: bool,
    ) -> Result<String, ClientError> {
        self.calls.lock().unwrap().push(LogCall {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            tail_lines: tail_lines.get(),
            previous,
        });

        self.logs
            .get(&key(namespace, pod, container, previous))
            .cloned()
            .unwrap_or_else(|| {
                Err(ClientError::NotFound(format!(
                    "container {} of pod {}/{} (previous: {})",
                    container, namespace, pod, previous
                )))
            })
    }

    async fn list_pod_containers(
        &self,
        pod: &str,
        namespace: &str,
    ) -> Result<Vec<String>, ClientError> {
        self.pods
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ClientError::NotFound(format!("pod {}/{}", namespace, pod))))
    }
}

/// Scripted content of one watch session
pub enum FakeSession {
    /// The session opens and yields these items, then ends
    Items(Vec<Result<WatchItem, ClientError>>),
    /// The session opens and never yields anything
    Silent,
    /// The session opens, yields nothing and is closed by the server later
    ClosesAfter(Duration),
    /// Opening the session fails
    OpenError(ClientError),
}

/// Scripted watch client
///
/// Each `stream_events` call consumes the next scripted session and records
/// the resource version it was asked to resume from. Once the script is
/// exhausted, sessions open and stay silent forever.
#[derive(Default)]
pub struct FakeWatchClient {
    sessions: Mutex<VecDeque<FakeSession>>,
    opened: AtomicUsize,
    resource_versions: Mutex<Vec<String>>,
}

impl FakeWatchClient {
    /// Create a client with no scripted sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a session yielding the given events
    pub fn with_session(self, events: Vec<Event>) -> Self {
        self.with_items(events.into_iter().map(Ok).collect())
    }

    /// Append a session yielding events and stream errors
    pub fn with_items(self, items: Vec<Result<Event, ClientError>>) -> Self {
        self.with_watch_items(
            items
                .into_iter()
                .map(|item| item.map(|event| WatchItem::Event(Box::new(event))))
                .collect(),
        )
    }

    /// Append a session with arbitrary watch items, bookmarks included
    pub fn with_watch_items(self, items: Vec<Result<WatchItem, ClientError>>) -> Self {
        self.push(FakeSession::Items(items));
        self
    }

    /// Append a session that never yields and never closes
    pub fn with_silent_session(self) -> Self {
        self.push(FakeSession::Silent);
        self
    }

    /// Append an empty session the server closes after `delay`
    pub fn with_session_closing_after(self, delay: Duration) -> Self {
        self.push(FakeSession::ClosesAfter(delay));
        self
    }

    /// Append a session that fails to open
    pub fn with_open_error(self, error: ClientError) -> Self {
        self.push(FakeSession::OpenError(error));
        self
    }

    fn push(&self, session: FakeSession) {
        self.sessions.lock().unwrap().push_back(session);
    }

    /// Number of `stream_events` calls so far
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Resource version passed to each `stream_events` call, in call order
    pub fn resource_versions(&self) -> Vec<String> {
        self.resource_versions.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventWatchClient for FakeWatchClient {
    async fn stream_events(
        &self,
        _timeout_secs: u32,
        resource_version: &str,
    ) -> Result<RawEventStream, ClientError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.resource_versions
            .lock()
            .unwrap()
            .push(resource_version.to_string());
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(FakeSession::Items(items)) => Ok(stream::iter(items).boxed()),
            Some(FakeSession::ClosesAfter(delay)) => {
                let closing = stream::once(tokio::time::sleep(delay))
                    .filter_map(|()| future::ready(None::<Result<WatchItem, ClientError>>));
                Ok(closing.boxed())
            }
            Some(FakeSession::OpenError(error)) => Err(error),
            Some(FakeSession::Silent) | None => Ok(stream::pending().boxed()),
        }
    }
}
