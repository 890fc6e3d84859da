//! Slack Web API sink
//!
//! Each incident becomes one channel message. When logs were collected they
//! are uploaded as a text file and shared in the message's thread, using the
//! external upload flow:
//!
//! 1. `chat.postMessage`
//! 2. `files.getUploadURLExternal`
//! 3. raw POST of the file bytes to the returned upload URL
//! 4. `files.completeUploadExternal`

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{Notifier, NotifyError};
use crate::config::SlackConfig;
use crate::events::{ContainerLogBundle, NormalizedEvent};

const NOT_AVAILABLE: &str = "N/A";
const UPLOAD_COMMENT: &str = "Attached logs for the Kubernetes event:";

/// Subset of a Web API response that the sink reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
    upload_url: Option<String>,
    file_id: Option<String>,
}

/// Notifier posting incidents to a Slack channel.
///
/// # Examples
///
/// ```
/// use eventlens::config::SlackConfig;
/// use eventlens::notify::SlackNotifier;
///
/// let config = SlackConfig {
///     bot_token: Some("xoxb-test".to_string()),
///     channel: Some("#alerts".to_string()),
///     ..Default::default()
/// };
/// assert!(SlackNotifier::new(&config, None).is_ok());
///
/// assert!(SlackNotifier::new(&SlackConfig::default(), None).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    api_base: String,
    token: String,
    channel: String,
    cluster_name: Option<String>,
}

impl SlackNotifier {
    /// Creates a Slack notifier.
    ///
    /// # Arguments
    ///
    /// * `config` - Token, channel, API base URL and request timeout
    /// * `cluster_name` - Optional label prefixed to every message header
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Config` when the token or channel is missing,
    /// and `NotifyError::Http` when the HTTP client cannot be built.
    pub fn new(config: &SlackConfig, cluster_name: Option<String>) -> Result<Self, NotifyError> {
        let token = config
            .bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NotifyError::Config("Slack bot token is required".to_string()))?;
        let channel = config
            .channel
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| NotifyError::Config("Slack channel is required".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("eventlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Http(format!("Failed to create HTTP client: {}", e)))?;

        info!(channel = %channel, api_base = %config.api_base, "Initialized Slack notifier");

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            channel,
            cluster_name,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// Header line of the message.
    fn headline(&self, event: &NormalizedEvent) -> String {
        let object = &event.involved_object;
        let headline = format!(
            "*{}:* {} {}/{} -> {}",
            event.event_type, object.kind, object.namespace, object.name, event.reason
        );
        match &self.cluster_name {
            Some(cluster) => format!("[{}] {}", cluster, headline),
            None => headline,
        }
    }

    /// Builds the `chat.postMessage` request body.
    fn message_body(&self, event: &NormalizedEvent) -> Value {
        let object = &event.involved_object;
        let message = if event.message.is_empty() {
            "(no message)"
        } else {
            event.message.as_str()
        };

        json!({
            "channel": self.channel,
            "text": event.to_string(),
            "blocks": [
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": self.headline(event) }
                },
                {
                    "type": "section",
                    "fields": [
                        { "type": "mrkdwn", "text": format!("*Involved Object:*\n{}", object.name) },
                        { "type": "mrkdwn", "text": format!("*Namespace:*\n{}", object.namespace) },
                        { "type": "mrkdwn", "text": format!("*Kind:*\n{}", object.kind) },
                        { "type": "mrkdwn", "text": format!("*Reason:*\n{}", event.reason) }
                    ]
                },
                { "type": "divider" },
                {
                    "type": "rich_text",
                    "elements": [
                        {
                            "type": "rich_text_preformatted",
                            "elements": [ { "type": "text", "text": message } ]
                        }
                    ]
                },
                {
                    "type": "section",
                    "fields": [
                        {
                            "type": "mrkdwn",
                            "text": format!("*Event Timestamp:*\n{}", format_time(event.timestamp))
                        },
                        {
                            "type": "mrkdwn",
                            "text": format!(
                                "*Creation Timestamp:*\n{}",
                                format_time(event.metadata.creation_timestamp)
                            )
                        },
                        {
                            "type": "mrkdwn",
                            "text": format!(
                                "*Deletion Timestamp:*\n{}",
                                format_time(event.metadata.deletion_timestamp)
                            )
                        }
                    ]
                }
            ]
        })
    }

    /// Reads a Web API response and turns `ok: false` into an error.
    async fn check(method: &str, response: reqwest::Response) -> Result<SlackResponse, NotifyError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http(format!(
                "{} returned {}: {}",
                method, status, body
            )));
        }

        let parsed: SlackResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::InvalidResponse(format!("{}: {}", method, e)))?;

        if !parsed.ok {
            return Err(NotifyError::Slack {
                method: method.to_string(),
                error: parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }

        Ok(parsed)
    }

    async fn post_message(&self, event: &NormalizedEvent) -> Result<SlackResponse, NotifyError> {
        let method = "chat.postMessage";
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(&self.message_body(event))
            .send()
            .await
            .map_err(|e| NotifyError::Http(format!("{} request failed: {}", method, e)))?;

        Self::check(method, response).await
    }

    async fn upload_logs(
        &self,
        event: &NormalizedEvent,
        logs: &ContainerLogBundle,
        channel: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), NotifyError> {
        let object = &event.involved_object;
        let filename = format!(
            "logs_{}_{}_{}.txt",
            object.kind, object.namespace, object.name
        );
        let content = logs.render();

        let method = "files.getUploadURLExternal";
        let length = content.len().to_string();
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.token)
            .form(&[("filename", filename.as_str()), ("length", length.as_str())])
            .send()
            .await
            .map_err(|e| NotifyError::Http(format!("{} request failed: {}", method, e)))?;
        let allocation = Self::check(method, response).await?;

        let upload_url = allocation
            .upload_url
            .ok_or_else(|| NotifyError::InvalidResponse(format!("{}: missing upload_url", method)))?;
        let file_id = allocation
            .file_id
            .ok_or_else(|| NotifyError::InvalidResponse(format!("{}: missing file_id", method)))?;

        debug!(file_id = %file_id, bytes = content.len(), "Uploading log file");
        let response = self
            .client
            .post(&upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content.into_bytes())
            .send()
            .await
            .map_err(|e| NotifyError::Http(format!("file upload failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(NotifyError::Http(format!(
                "file upload returned {}",
                response.status()
            )));
        }

        let method = "files.completeUploadExternal";
        let files = serde_json::to_string(&json!([{ "id": file_id, "title": filename }]))?;
        let mut form = vec![
            ("files", files),
            ("channel_id", channel.to_string()),
            ("initial_comment", UPLOAD_COMMENT.to_string()),
        ];
        if let Some(ts) = thread_ts {
            form.push(("thread_ts", ts.to_string()));
        }

        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.token)
            .form(&form)
            .send()
            .await
            .map_err(|e| NotifyError::Http(format!("{} request failed: {}", method, e)))?;
        Self::check(method, response).await?;

        Ok(())
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn notify(
        &self,
        event: &NormalizedEvent,
        logs: &ContainerLogBundle,
    ) -> Result<(), NotifyError> {
        info!(
            namespace = %event.involved_object.namespace,
            name = %event.involved_object.name,
            reason = %event.reason,
            "Sending Slack notification"
        );

        let posted = self.post_message(event).await?;

        if logs.has_logs() {
            let channel = posted.channel.as_deref().unwrap_or(&self.channel);
            self.upload_logs(event, logs, channel, posted.ts.as_deref())
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::warning_event;
    use chrono::TimeZone;

    fn notifier(cluster: Option<&str>) -> SlackNotifier {
        let config = SlackConfig {
            bot_token: Some("xoxb-test".to_string()),
            channel: Some("C123".to_string()),
            ..Default::default()
        };
        SlackNotifier::new(&config, cluster.map(str::to_string)).unwrap()
    }

    fn event() -> NormalizedEvent {
        NormalizedEvent::from_raw(&warning_event(
            "ns1",
            "p1",
            "BackOff",
            "Back-off restarting failed container",
        ))
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = SlackConfig {
            bot_token: Some("xoxb-test".to_string()),
            channel: None,
            ..Default::default()
        };
        assert!(matches!(
            SlackNotifier::new(&config, None),
            Err(NotifyError::Config(_))
        ));

        let config = SlackConfig {
            bot_token: Some(String::new()),
            channel: Some("C123".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            SlackNotifier::new(&config, None),
            Err(NotifyError::Config(_))
        ));
    }

    #[test]
    fn test_headline() {
        assert_eq!(
            notifier(None).headline(&event()),
            "*Warning:* Pod ns1/p1 -> BackOff"
        );
        assert_eq!(
            notifier(Some("prod-eu")).headline(&event()),
            "[prod-eu] *Warning:* Pod ns1/p1 -> BackOff"
        );
    }

    #[test]
    fn test_message_body_blocks() {
        let body = notifier(None).message_body(&event());

        assert_eq!(body["channel"], "C123");
        assert_eq!(body["text"], "Warning Pod ns1/p1 -> BackOff");

        let blocks = body["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[1]["fields"][3]["text"], "*Reason:*\nBackOff");
        assert_eq!(blocks[2]["type"], "divider");
        assert_eq!(
            blocks[3]["elements"][0]["elements"][0]["text"],
            "Back-off restarting failed container"
        );
        assert_eq!(blocks[4]["fields"][0]["text"], "*Event Timestamp:*\nN/A");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(None), "N/A");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(format_time(Some(t)), "2024-05-01T12:30:00Z");
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let config = SlackConfig {
            bot_token: Some("xoxb-test".to_string()),
            channel: Some("C123".to_string()),
            api_base: "http://localhost:1234/api/".to_string(),
            ..Default::default()
        };
        let notifier = SlackNotifier::new(&config, None).unwrap();
        assert_eq!(
            notifier.url("chat.postMessage"),
            "http://localhost:1234/api/chat.postMessage"
        );
    }
}
