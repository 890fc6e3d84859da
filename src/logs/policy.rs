//! Previous-vs-current log source decision

use std::collections::BTreeSet;

use crate::config::LogRetrievalConfig;
use crate::events::NormalizedEvent;

/// Reason emitted by the kubelet for failed probes.
const UNHEALTHY_REASON: &str = "Unhealthy";

/// Decides, per event, whether the previous container instance holds the
/// useful logs.
///
/// An event asks for previous logs when its reason is one of the configured
/// restart-indicating reasons, or when it is an `Unhealthy` event whose
/// message carries the liveness-failure marker. Readiness failures never
/// restart a container, so they do not trigger the override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalPolicy {
    restart_reasons: BTreeSet<String>,
    liveness_marker: String,
}

impl RetrievalPolicy {
    /// Creates a policy from a set of reasons and a liveness marker.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::logs::RetrievalPolicy;
    ///
    /// let policy = RetrievalPolicy::new(["BackOff", "Evicted"], "Liveness probe failed");
    /// assert!(policy.restart_reasons().contains("Evicted"));
    /// ```
    pub fn new<I, S>(restart_reasons: I, liveness_marker: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            restart_reasons: restart_reasons.into_iter().map(Into::into).collect(),
            liveness_marker: liveness_marker.into(),
        }
    }

    /// Builds the policy from validated configuration.
    pub fn from_config(config: &LogRetrievalConfig) -> Self {
        Self::new(
            config.restart_reasons.iter().cloned(),
            config.liveness_marker.clone(),
        )
    }

    /// Configured restart-indicating reasons.
    pub fn restart_reasons(&self) -> &BTreeSet<String> {
        &self.restart_reasons
    }

    /// Substring identifying a liveness-probe failure message.
    pub fn liveness_marker(&self) -> &str {
        &self.liveness_marker
    }

    /// Returns true when previous-instance logs should be tried first.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::logs::RetrievalPolicy;
    /// use eventlens::events::NormalizedEvent;
    /// use k8s_openapi::api::core::v1::Event;
    ///
    /// let policy = RetrievalPolicy::default();
    /// let event = NormalizedEvent::from_raw(&Event {
    ///     reason: Some("Unhealthy".to_string()),
    ///     message: Some("Liveness probe failed: HTTP probe failed with statuscode: 500".to_string()),
    ///     ..Default::default()
    /// });
    /// assert!(policy.fetch_previous(&event));
    /// ```
    pub fn fetch_previous(&self, event: &NormalizedEvent) -> bool {
        if self.restart_reasons.contains(&event.reason) {
            return true;
        }

        event.reason == UNHEALTHY_REASON && event.message.contains(&self.liveness_marker)
    }
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self::from_config(&LogRetrievalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Event;

    fn event(reason: &str, message: &str) -> NormalizedEvent {
        NormalizedEvent::from_raw(&Event {
            type_: Some("Warning".to_string()),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_default_restart_reasons() {
        let policy = RetrievalPolicy::default();
        let reasons: Vec<&str> = policy.restart_reasons().iter().map(String::as_str).collect();
        assert_eq!(reasons, vec!["BackOff", "Failed"]);
        assert_eq!(policy.liveness_marker(), "Liveness probe failed");
    }

    #[test]
    fn test_restart_reasons_fetch_previous() {
        let policy = RetrievalPolicy::default();
        assert!(policy.fetch_previous(&event("BackOff", "Back-off restarting failed container")));
        assert!(policy.fetch_previous(&event("Failed", "Error: ErrImagePull")));
    }

    #[test]
    fn test_other_reasons_fetch_current() {
        let policy = RetrievalPolicy::default();
        assert!(!policy.fetch_previous(&event("Started", "Started container app")));
        assert!(!policy.fetch_previous(&event("FailedScheduling", "0/3 nodes are available")));
        assert!(!policy.fetch_previous(&event("Evicted", "The node was low on resource")));
    }

    #[test]
    fn test_liveness_failure_forces_previous() {
        let policy = RetrievalPolicy::default();
        assert!(policy.fetch_previous(&event(
            "Unhealthy",
            "Liveness probe failed: Get \"http://10.0.0.1:8080/healthz\": connection refused"
        )));
    }

    #[test]
    fn test_readiness_failure_does_not_force_previous() {
        let policy = RetrievalPolicy::default();
        assert!(!policy.fetch_previous(&event(
            "Unhealthy",
            "Readiness probe failed: HTTP probe failed with statuscode: 503"
        )));
    }

    #[test]
    fn test_liveness_marker_only_applies_to_unhealthy() {
        let policy = RetrievalPolicy::default();
        assert!(!policy.fetch_previous(&event("Killing", "Liveness probe failed, will be restarted")));
    }

    #[test]
    fn test_configured_reasons_replace_defaults() {
        let policy = RetrievalPolicy::new(["Evicted", "Unhealthy"], "Liveness probe failed");
        assert!(policy.fetch_previous(&event("Evicted", "")));
        assert!(policy.fetch_previous(&event("Unhealthy", "Readiness probe failed")));
        assert!(!policy.fetch_previous(&event("BackOff", "")));
    }

    #[test]
    fn test_custom_liveness_marker() {
        let policy = RetrievalPolicy::new(Vec::<String>::new(), "liveness check down");
        assert!(policy.fetch_previous(&event("Unhealthy", "probe: liveness check down")));
        assert!(!policy.fetch_previous(&event("Unhealthy", "Liveness probe failed")));
    }
}
