//! Structured logging setup for the service
//!
//! Provides JSON-formatted and human-readable logging with optional file output.
//! Integrates with the tracing ecosystem for structured event logging.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging based on configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Output always
/// goes to STDOUT; a file, when configured, receives the same records in
/// the same format.
///
/// # Arguments
///
/// * `config` - Logging configuration
///
/// # Errors
///
/// Returns an error if the level is not a valid filter, the log file cannot
/// be opened, or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// use eventlens::config::LoggingConfig;
/// use eventlens::watcher::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// let result = init_logging(&config);
/// assert!(result.is_ok());
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_format {
        let stdout_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true);

        if let Some(file_path) = &config.file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;

            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(Arc::new(file));

            registry.with(stdout_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stdout_layer).try_init()?;
        }
    } else {
        let stdout_layer = fmt::layer().with_target(true).with_level(true);

        if let Some(file_path) = &config.file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));

            registry.with(stdout_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stdout_layer).try_init()?;
        }
    }

    Ok(())
}

/// Create a span carrying the identifying fields of a normalized event.
///
/// # Examples
///
/// ```
/// use eventlens::event_span;
/// use eventlens::events::NormalizedEvent;
/// use k8s_openapi::api::core::v1::Event;
///
/// let event = NormalizedEvent::from_raw(&Event::default());
/// let span = event_span!(event);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! event_span {
    ($event:expr) => {
        tracing::info_span!(
            "process_event",
            event_type = %$event.event_type,
            reason = %$event.reason,
            kind = %$event.involved_object.kind,
            namespace = %$event.involved_object.namespace,
            name = %$event.involved_object.name
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_invalid_level_is_rejected() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "eventlens=loud".to_string(),
            json_format: false,
            file_path: None,
        };

        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_unwritable_log_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            json_format: true,
            file_path: Some(dir.path().join("missing").join("eventlens.log")),
        };

        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_event_span_fields() {
        let event = crate::events::NormalizedEvent::from_raw(&crate::test_utils::warning_event(
            "ns1", "p1", "BackOff", "",
        ));
        let span = crate::event_span!(event);
        let _guard = span.enter();
    }
}
