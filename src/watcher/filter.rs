//! Actionable-event classification
//!
//! This module decides which normalized events are worth a notification.
//! Everything else is benign lifecycle noise and is dropped by the watcher.

use std::collections::BTreeSet;

use crate::config::WatcherConfig;
use crate::events::NormalizedEvent;

/// Event filter selecting actionable events by event type.
///
/// An event is actionable iff its type is a member of the configured set.
/// An empty set discards every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    actionable_types: BTreeSet<String>,
}

impl EventFilter {
    /// Create a new event filter from a set of actionable types.
    ///
    /// # Arguments
    ///
    /// * `actionable_types` - Event types to pass on to the processor
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::watcher::EventFilter;
    ///
    /// let filter = EventFilter::new(["Warning", "Error"]);
    /// assert!(filter.is_actionable("Warning"));
    /// assert!(!filter.is_actionable("Normal"));
    /// ```
    pub fn new<I, S>(actionable_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actionable_types: actionable_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a filter from watcher configuration.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::new(config.actionable_types.iter().cloned())
    }

    /// Check whether a raw event type string is actionable.
    pub fn is_actionable(&self, event_type: &str) -> bool {
        self.actionable_types.contains(event_type)
    }

    /// Check if an event should be handed to the processor.
    ///
    /// # Arguments
    ///
    /// * `event` - Normalized event to evaluate
    ///
    /// # Returns
    ///
    /// Returns true if the event's type is in the actionable set
    pub fn should_process(&self, event: &NormalizedEvent) -> bool {
        self.is_actionable(event.event_type.as_str())
    }

    /// Get filter summary for logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::watcher::EventFilter;
    ///
    /// let filter = EventFilter::new(["Warning", "BackOff"]);
    /// assert_eq!(filter.summary(), "types=BackOff,Warning");
    ///
    /// let filter = EventFilter::new(Vec::<String>::new());
    /// assert_eq!(filter.summary(), "no actionable types (all events discarded)");
    /// ```
    pub fn summary(&self) -> String {
        if self.actionable_types.is_empty() {
            return "no actionable types (all events discarded)".to_string();
        }

        let types: Vec<&str> = self.actionable_types.iter().map(String::as_str).collect();
        format!("types={}", types.join(","))
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::from_config(&WatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::pod_event;

    fn event(event_type: &str) -> NormalizedEvent {
        NormalizedEvent::from_raw(&pod_event(event_type, "ns1", "p1", "Something", ""))
    }

    #[test]
    fn test_default_actionable_set() {
        let filter = EventFilter::default();
        for event_type in [
            "Warning",
            "Error",
            "Failed",
            "Evicted",
            "Unhealthy",
            "BackOff",
            "FailedScheduling",
        ] {
            assert!(filter.is_actionable(event_type), "{} should be actionable", event_type);
        }
        assert!(!filter.is_actionable("Normal"));
    }

    #[test]
    fn test_normal_events_are_discarded() {
        let filter = EventFilter::default();
        assert!(!filter.should_process(&event("Normal")));
    }

    #[test]
    fn test_warning_events_pass() {
        let filter = EventFilter::default();
        assert!(filter.should_process(&event("Warning")));
    }

    #[test]
    fn test_unknown_type_checked_against_raw_string() {
        let filter = EventFilter::new(["Critical"]);
        assert!(filter.should_process(&event("Critical")));
        assert!(!filter.should_process(&event("Warning")));
    }

    #[test]
    fn test_missing_type_is_not_actionable() {
        let filter = EventFilter::default();
        let raw = k8s_openapi::api::core::v1::Event::default();
        assert!(!filter.should_process(&NormalizedEvent::from_raw(&raw)));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let filter = EventFilter::default();
        assert!(!filter.is_actionable("warning"));
    }

    #[test]
    fn test_empty_filter_discards_everything() {
        let filter = EventFilter::new(Vec::<String>::new());
        assert!(!filter.should_process(&event("Warning")));
    }
}
