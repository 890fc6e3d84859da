//! Shared helpers for integration tests
//!
//! In-memory cluster clients and a recording notifier built only on the
//! public API of the crate.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use eventlens::cluster::{ClientError, EventWatchClient, PodLogClient, RawEventStream, WatchItem};
use eventlens::events::{ContainerLogBundle, NormalizedEvent};
use eventlens::logs::TailLines;
use eventlens::notify::{Notifier, NotifyError};

/// Build a raw event about a pod
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

/// Watch client replaying scripted sessions, then staying silent
#[derive(Default)]
pub struct ScriptedWatchClient {
    sessions: Mutex<VecDeque<Result<Vec<Result<WatchItem, ClientError>>, ClientError>>>,
}

impl ScriptedWatchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a session that yields the given events and then closes
    pub fn session(self, events: Vec<Event>) -> Self {
        self.sessions
            .lock()
            .unwrap()
            .push_back(Ok(events
                .into_iter()
                .map(|event| Ok(WatchItem::Event(Box::new(event))))
                .collect()));
        self
    }

    /// Append a session that fails to open
    pub fn failing_session(self, error: ClientError) -> Self {
        self.sessions.lock().unwrap().push_back(Err(error));
        self
    }
}

#[async_trait]
impl EventWatchClient for ScriptedWatchClient {
    async fn stream_events(
        &self,
        _timeout_secs: u32,
        _resource_version: &str,
    ) -> Result<RawEventStream, ClientError> {
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(Ok(items)) => Ok(stream::iter(items).boxed()),
            Some(Err(error)) => Err(error),
            None => Ok(stream::pending().boxed()),
        }
    }
}

/// Pod log client backed by a map; unknown pods and logs are `NotFound`
#[derive(Default)]
pub struct MapPodLogClient {
    pods: HashMap<(String, String), Vec<String>>,
    logs: HashMap<(String, String, bool), String>,
    reads: Mutex<Vec<(String, bool)>>,
}

impl MapPodLogClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pod(mut self, namespace: &str, pod: &str, containers: &[&str]) -> Self {
        self.pods.insert(
            (namespace.to_string(), pod.to_string()),
            containers.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn log(mut self, pod: &str, container: &str, previous: bool, text: &str) -> Self {
        self.logs.insert(
            (pod.to_string(), container.to_string(), previous),
            text.to_string(),
        );
        self
    }

    /// `(container, previous)` for every read, in call order
    pub fn reads(&self) -> Vec<(String, bool)> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl PodLogClient for MapPodLogClient {
    async fn read_container_log(
        &self,
        pod: &str,
        _namespace: &str,
        container: &str,
        _tail_lines: TailLines,
        previous: bool,
    ) -> Result<String, ClientError> {
        self.reads
            .lock()
            .unwrap()
            .push((container.to_string(), previous));
        self.logs
            .get(&(pod.to_string(), container.to_string(), previous))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("{}/{}", pod, container)))
    }

    async fn list_pod_containers(
        &self,
        pod: &str,
        namespace: &str,
    ) -> Result<Vec<String>, ClientError> {
        self.pods
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("pod {}/{}", namespace, pod)))
    }
}

/// Notifier recording every incident it receives
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    received: Arc<Mutex<Vec<(NormalizedEvent, ContainerLogBundle)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(NormalizedEvent, ContainerLogBundle)> {
        self.received.lock().unwrap().clone()
    }

    /// Poll until `count` incidents arrived or `deadline` passed
    pub async fn wait_for(&self, count: usize, deadline: Duration) -> bool {
        let start = tokio::time::Instant::now();
        while start.elapsed() < deadline {
            if self.received.lock().unwrap().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.received.lock().unwrap().len() >= count
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(
        &self,
        event: &NormalizedEvent,
        logs: &ContainerLogBundle,
    ) -> Result<(), NotifyError> {
        self.received
            .lock()
            .unwrap()
            .push((event.clone(), logs.clone()));
        Ok(())
    }
}
