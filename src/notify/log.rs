//! Sink that writes incidents to the service log.

use async_trait::async_trait;
use tracing::info;

use super::{Notifier, NotifyError};
use crate::events::{ContainerLogBundle, NormalizedEvent};

/// Notifier that emits each incident as a structured `info` record.
///
/// Used for dry runs and when no chat destination is configured.
///
/// # Examples
///
/// ```
/// use eventlens::events::{ContainerLogBundle, NormalizedEvent};
/// use eventlens::notify::{LogNotifier, Notifier};
/// use k8s_openapi::api::core::v1::Event;
///
/// let notifier = LogNotifier::new();
/// let event = NormalizedEvent::from_raw(&Event::default());
/// # tokio_test::block_on(async {
/// assert!(notifier.notify(&event, &ContainerLogBundle::new()).await.is_ok());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    include_logs: bool,
}

impl LogNotifier {
    /// Creates a notifier that includes the rendered logs in the record.
    pub fn new() -> Self {
        Self { include_logs: true }
    }

    /// Creates a notifier that only reports which containers had logs.
    pub fn summary_only() -> Self {
        Self {
            include_logs: false,
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(
        &self,
        event: &NormalizedEvent,
        logs: &ContainerLogBundle,
    ) -> Result<(), NotifyError> {
        let event_json = serde_json::to_string(event)?;
        let with_logs: Vec<&str> = logs
            .entries()
            .iter()
            .filter(|entry| entry.logs.is_some())
            .map(|entry| entry.container.as_str())
            .collect();

        if self.include_logs && logs.has_logs() {
            info!(
                incident = %event,
                event = %event_json,
                containers = logs.len(),
                containers_with_logs = ?with_logs,
                logs = %logs.render(),
                "Incident"
            );
        } else {
            info!(
                incident = %event,
                event = %event_json,
                containers = logs.len(),
                containers_with_logs = ?with_logs,
                "Incident"
            );
        }

        Ok(())
    }
}
