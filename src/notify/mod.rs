//! Notification sinks
//!
//! A sink receives one event together with the logs collected for it. The
//! processor calls [`Notifier::notify`] once per event and only logs the
//! outcome; a failing sink never stops processing.
//!
//! - [`slack`]: posts to a Slack channel through the Web API
//! - [`log`]: writes the incident to the service log

pub mod log;
pub mod slack;

use async_trait::async_trait;
use thiserror::Error;

use crate::events::{ContainerLogBundle, NormalizedEvent};

pub use self::log::LogNotifier;
pub use self::slack::SlackNotifier;

/// Errors returned by notification sinks.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The sink is missing required settings
    #[error("Notifier configuration error: {0}")]
    Config(String),

    /// The request could not be sent or returned a non-success status
    #[error("HTTP error: {0}")]
    Http(String),

    /// Slack answered with `ok: false`
    #[error("Slack API error in {method}: {error}")]
    Slack {
        /// Web API method that failed
        method: String,
        /// Error code returned by Slack
        error: String,
    },

    /// The response body was not what the API documents
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for incident notifications.
///
/// Implementations are selected at startup and shared by the processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short sink name used in logs.
    fn name(&self) -> &'static str;

    /// Delivers one event with its container logs.
    ///
    /// # Arguments
    ///
    /// * `event` - The actionable event
    /// * `logs` - Logs collected for the event; may be empty
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] when delivery fails. Callers log it and
    /// move on.
    async fn notify(
        &self,
        event: &NormalizedEvent,
        logs: &ContainerLogBundle,
    ) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_error_display() {
        let err = NotifyError::Slack {
            method: "chat.postMessage".to_string(),
            error: "channel_not_found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Slack API error in chat.postMessage: channel_not_found"
        );

        let err = NotifyError::Config("missing bot token".to_string());
        assert_eq!(
            err.to_string(),
            "Notifier configuration error: missing bot token"
        );

        let err = NotifyError::Http("connection refused".to_string());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }
}
