//! Service metrics for the watch loop, log retrieval and notification
//!
//! # Metrics
//!
//! - `eventlens_events_received_total`: Counter of events read from watch sessions
//! - `eventlens_events_enqueued_total`: Counter of actionable events handed to the processor
//! - `eventlens_watch_reconnects_total`: Counter of session restarts by reason
//! - `eventlens_log_fetch_total`: Counter of container log reads by source and outcome
//! - `eventlens_log_fetch_duration_seconds`: Histogram of single log read latency
//! - `eventlens_notifications_total`: Counter of sink deliveries by outcome
//!
//! # Examples
//!
//! ```
//! use eventlens::metrics::{LogReadTimer, LogSource};
//!
//! let timer = LogReadTimer::start(LogSource::Current);
//! timer.record("found");
//! ```

use metrics::{histogram, increment_counter};
use std::time::{Duration, Instant};

/// Why a watch session was replaced with a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    /// The session ended at its timeout
    Timeout,
    /// The server closed the session well before its timeout
    ClosedEarly,
    /// The resume version was too old; the next session replays from scratch
    Gone,
    /// The API server reported an error inside the session
    ApiError,
    /// The stream failed in transport or decoding
    StreamError,
    /// A new session could not be opened
    OpenFailed,
}

impl ReconnectReason {
    /// Label value used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconnectReason::Timeout => "timeout",
            ReconnectReason::ClosedEarly => "closed_early",
            ReconnectReason::Gone => "gone",
            ReconnectReason::ApiError => "api_error",
            ReconnectReason::StreamError => "stream_error",
            ReconnectReason::OpenFailed => "open_failed",
        }
    }
}

/// Which container instance a log read targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    /// The terminated instance before the latest restart
    Previous,
    /// The running (or most recent) instance
    Current,
}

impl LogSource {
    /// Label value used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Previous => "previous",
            LogSource::Current => "current",
        }
    }

    /// Maps the `previous` flag of a log read to its source.
    pub fn from_previous(previous: bool) -> Self {
        if previous {
            LogSource::Previous
        } else {
            LogSource::Current
        }
    }
}

/// Counts one event read from a watch session.
pub fn record_event_received() {
    increment_counter!("eventlens_events_received_total");
}

/// Counts one actionable event placed on the handoff queue.
pub fn record_event_enqueued() {
    increment_counter!("eventlens_events_enqueued_total");
}

/// Counts one watch session restart.
pub fn record_reconnect(reason: ReconnectReason) {
    increment_counter!("eventlens_watch_reconnects_total", "reason" => reason.as_str());
}

/// Counts one notification attempt.
///
/// # Arguments
///
/// * `outcome` - "delivered" or "failed"
pub fn record_notification(outcome: &'static str) {
    increment_counter!("eventlens_notifications_total", "outcome" => outcome);
}

/// Times a single container log read.
///
/// Created right before the request is issued; [`LogReadTimer::record`]
/// emits the counter and duration histogram labeled with the outcome.
#[derive(Debug)]
pub struct LogReadTimer {
    source: LogSource,
    start: Instant,
}

impl LogReadTimer {
    /// Starts timing a read against the given source.
    pub fn start(source: LogSource) -> Self {
        Self {
            source,
            start: Instant::now(),
        }
    }

    /// Returns the source this timer was started for.
    pub fn source(&self) -> LogSource {
        self.source
    }

    /// Returns elapsed time since the read started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Records the read's outcome ("found", "not_found" or "error").
    pub fn record(self, outcome: &'static str) {
        let source = self.source.as_str();

        histogram!(
            "eventlens_log_fetch_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "source" => source
        );

        increment_counter!(
            "eventlens_log_fetch_total",
            "source" => source,
            "outcome" => outcome
        );
    }
}

/// Initializes the metrics exporter for Prometheus
///
/// When the `prometheus` feature is enabled, this installs the Prometheus
/// exporter with its default listener. Otherwise it does nothing and is
/// still safe to call.
///
/// # Examples
///
/// ```
/// use eventlens::metrics::init_metrics_exporter;
///
/// init_metrics_exporter();
/// ```
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
