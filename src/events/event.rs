//! Normalized Kubernetes event record
//!
//! A [`NormalizedEvent`] is an owned snapshot of a core/v1 `Event`, taken once
//! when the watcher classifies the raw object. Downstream code (the processor,
//! the log fetcher, notification sinks) only ever sees this type, never the
//! API object itself.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use k8s_openapi::Resource;
use serde::{Serialize, Serializer};
use std::fmt;

/// Event severity as reported in the event's `type` field.
///
/// Kubernetes only defines `Normal` and `Warning`, but reporters are free to
/// put any string here, so unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Routine lifecycle event
    Normal,
    /// Something went wrong
    Warning,
    /// Any other raw value (including the empty string when absent)
    Other(String),
}

impl EventType {
    /// Returns the raw string form of the event type.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::events::EventType;
    ///
    /// assert_eq!(EventType::Warning.as_str(), "Warning");
    /// assert_eq!(EventType::Other("Error".to_string()).as_str(), "Error");
    /// ```
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Normal => "Normal",
            EventType::Warning => "Warning",
            EventType::Other(raw) => raw,
        }
    }
}

impl From<Option<&str>> for EventType {
    fn from(raw: Option<&str>) -> Self {
        match raw {
            Some("Normal") => EventType::Normal,
            Some("Warning") => EventType::Warning,
            Some(other) => EventType::Other(other.to_string()),
            None => EventType::Other(String::new()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Component and host that reported the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventSourceInfo {
    /// Reporting component (e.g. `kubelet`)
    pub component: String,
    /// Node the component runs on
    pub host: String,
}

/// Object the event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvolvedObject {
    /// Object kind (e.g. `Pod`)
    pub kind: String,
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
}

/// Metadata of the event object itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    /// Event object name
    pub name: String,
    /// Event object namespace
    pub namespace: String,
    /// When the event object was created
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// When the event object was marked for deletion
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

/// Immutable snapshot of a cluster event.
///
/// Every timestamp is either a parsed instant or `None`; raw API values never
/// leak past [`NormalizedEvent::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
    /// Resource kind of the event object (always `Event`)
    pub kind: String,
    /// Reporting component and host
    pub source: EventSourceInfo,
    /// What action was taken or failed
    pub action: String,
    /// Event severity
    pub event_type: EventType,
    /// Namespace of the event object
    pub namespace: String,
    /// Name of the event object
    pub name: String,
    /// Short machine-readable reason (e.g. `BackOff`)
    pub reason: String,
    /// Human-readable description
    pub message: String,
    /// Object the event refers to
    pub involved_object: InvolvedObject,
    /// Event object metadata
    pub metadata: EventMetadata,
    /// Best available occurrence time
    pub timestamp: Option<DateTime<Utc>>,
}

impl NormalizedEvent {
    /// Builds a normalized snapshot from a raw core/v1 `Event`.
    ///
    /// Missing strings become empty strings. The occurrence time prefers
    /// `lastTimestamp`, then `eventTime`, then `firstTimestamp`, since newer
    /// reporters only fill in `eventTime`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::events::{EventType, NormalizedEvent};
    /// use k8s_openapi::api::core::v1::{Event, ObjectReference};
    ///
    /// let raw = Event {
    ///     type_: Some("Warning".to_string()),
    ///     reason: Some("BackOff".to_string()),
    ///     involved_object: ObjectReference {
    ///         kind: Some("Pod".to_string()),
    ///         name: Some("web-0".to_string()),
    ///         namespace: Some("shop".to_string()),
    ///         ..Default::default()
    ///     },
    ///     ..Default::default()
    /// };
    ///
    /// let event = NormalizedEvent::from_raw(&raw);
    /// assert_eq!(event.event_type, EventType::Warning);
    /// assert!(event.involves_pod());
    /// assert!(event.timestamp.is_none());
    /// ```
    pub fn from_raw(raw: &Event) -> Self {
        let metadata = EventMetadata {
            name: raw.metadata.name.clone().unwrap_or_default(),
            namespace: raw.metadata.namespace.clone().unwrap_or_default(),
            creation_timestamp: raw.metadata.creation_timestamp.as_ref().map(|t| t.0),
            deletion_timestamp: raw.metadata.deletion_timestamp.as_ref().map(|t| t.0),
        };

        let involved = &raw.involved_object;
        let involved_object = InvolvedObject {
            kind: involved.kind.clone().unwrap_or_default(),
            name: involved.name.clone().unwrap_or_default(),
            namespace: involved
                .namespace
                .clone()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| metadata.namespace.clone()),
        };

        let source = raw
            .source
            .as_ref()
            .map(|s| EventSourceInfo {
                component: s.component.clone().unwrap_or_default(),
                host: s.host.clone().unwrap_or_default(),
            })
            .unwrap_or_default();

        let timestamp = raw
            .last_timestamp
            .as_ref()
            .map(|t| t.0)
            .or_else(|| raw.event_time.as_ref().map(|t| t.0))
            .or_else(|| raw.first_timestamp.as_ref().map(|t| t.0));

        Self {
            kind: Event::KIND.to_string(),
            source,
            action: raw.action.clone().unwrap_or_default(),
            event_type: EventType::from(raw.type_.as_deref()),
            namespace: metadata.namespace.clone(),
            name: metadata.name.clone(),
            reason: raw.reason.clone().unwrap_or_default(),
            message: raw.message.clone().unwrap_or_default(),
            involved_object,
            metadata,
            timestamp,
        }
    }

    /// Returns true when the event is about a pod, i.e. logs can be fetched.
    pub fn involves_pod(&self) -> bool {
        self.involved_object.kind == "Pod"
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{} -> {}",
            self.event_type,
            self.involved_object.kind,
            self.involved_object.namespace,
            self.involved_object.name,
            self.reason
        )
    }
}
