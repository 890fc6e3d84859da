//! Processing loop
//!
//! Drains the handoff queue: for each event, collect container logs when
//! the event involves a pod, then hand event and logs to the notifier.
//! Nothing that goes wrong with a single event stops the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::ProcessingConfig;
use crate::error::Result;
use crate::events::{ContainerLogBundle, NormalizedEvent};
use crate::logs::{LogFetchError, LogFetcher};
use crate::metrics;
use crate::notify::Notifier;
use crate::queue::EventReceiver;

/// Consumer side of the pipeline.
pub struct Processor {
    queue: EventReceiver,
    fetcher: LogFetcher,
    notifier: Arc<dyn Notifier>,
    poll_interval: Duration,
}

impl Processor {
    /// Creates a processor.
    ///
    /// # Arguments
    ///
    /// * `queue` - Consumer half of the handoff queue
    /// * `fetcher` - Log Retrieval Engine
    /// * `notifier` - Sink receiving every event
    /// * `poll_interval` - Longest wait on the queue before the stop signal is re-checked
    pub fn new(
        queue: EventReceiver,
        fetcher: LogFetcher,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            fetcher,
            notifier,
            poll_interval,
        }
    }

    /// Creates a processor with the configured poll interval.
    pub fn from_config(
        config: &ProcessingConfig,
        queue: EventReceiver,
        fetcher: LogFetcher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(
            queue,
            fetcher,
            notifier,
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    /// Runs until `token` is cancelled or the queue is closed and drained.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` lets it run behind a
    /// [`crate::lifecycle::ServiceHandle`].
    pub async fn run(mut self, token: CancellationToken) -> Result<()> {
        info!(
            notifier = self.notifier.name(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            tail_lines = self.fetcher.tail_lines().get(),
            "Starting processor"
        );

        while !token.is_cancelled() {
            match tokio::time::timeout(self.poll_interval, self.queue.recv()).await {
                Ok(Some(event)) => {
                    let span = crate::event_span!(event);
                    self.process(event).instrument(span).await;
                }
                Ok(None) => {
                    info!("Handoff queue closed, stopping processor");
                    break;
                }
                Err(_) => continue,
            }
        }

        info!("Processor stopped");
        Ok(())
    }

    /// Handles one event: collect logs, then notify.
    pub async fn process(&self, event: NormalizedEvent) {
        info!(incident = %event, "Processing event");

        let logs = self.collect_logs(&event).await;

        match self.notifier.notify(&event, &logs).await {
            Ok(()) => {
                metrics::record_notification("delivered");
                debug!(notifier = self.notifier.name(), "Notification delivered");
            }
            Err(e) => {
                metrics::record_notification("failed");
                error!(
                    notifier = self.notifier.name(),
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
    }

    async fn collect_logs(&self, event: &NormalizedEvent) -> ContainerLogBundle {
        if !event.involves_pod() {
            debug!(
                kind = %event.involved_object.kind,
                "Event does not involve a pod, skipping log retrieval"
            );
            return ContainerLogBundle::new();
        }

        match self.fetcher.fetch(event).await {
            Ok(bundle) => bundle,
            Err(err @ LogFetchError::Partial { .. }) => {
                warn!(error = %err, "Log retrieval partially failed, notifying with partial logs");
                err.into_bundle()
            }
            Err(err @ LogFetchError::Pod(_)) => {
                error!(error = %err, "Log retrieval failed, notifying without logs");
                err.into_bundle()
            }
        }
    }
}
