//! One streaming subscription to cluster events

use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Event;
use tokio::time::Instant;

use crate::cluster::{ClientError, EventWatchClient, RawEventStream, WatchItem};

/// What a single read from a session produced.
#[derive(Debug)]
pub enum SessionItem {
    /// A raw event arrived
    Event(Box<Event>),
    /// The server reported progress up to a resource version
    Bookmark(String),
    /// The server closed the stream
    Closed,
    /// The client-side deadline passed without the server closing the stream
    Expired,
    /// The stream yielded an error
    Failed(ClientError),
}

/// A live watch subscription.
///
/// Owned exclusively by the watch loop and replaced on every reconnect.
/// Besides the server-side timeout it enforces a client-side deadline of
/// `timeout + grace`, so a server that never closes the stream still leads
/// to a reconnect.
pub struct WatchSession {
    stream: RawEventStream,
    timeout: Duration,
    opened_at: Instant,
    deadline: Instant,
}

impl WatchSession {
    /// Opens a new session starting at `resource_version`.
    ///
    /// # Errors
    ///
    /// Returns the client error when the subscription cannot be established.
    pub async fn open(
        client: &dyn EventWatchClient,
        timeout_secs: u32,
        resource_version: &str,
        grace: Duration,
    ) -> Result<Self, ClientError> {
        let stream = client.stream_events(timeout_secs, resource_version).await?;
        let timeout = Duration::from_secs(u64::from(timeout_secs));
        let opened_at = Instant::now();

        Ok(Self {
            stream,
            timeout,
            opened_at,
            deadline: opened_at + timeout + grace,
        })
    }

    /// Time since the session was opened.
    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Whether the session has lived less than half its server-side timeout.
    pub fn is_young(&self) -> bool {
        self.elapsed() < self.timeout / 2
    }

    /// Waits for the next item.
    pub async fn next(&mut self) -> SessionItem {
        match tokio::time::timeout_at(self.deadline, self.stream.next()).await {
            Ok(Some(Ok(WatchItem::Event(event)))) => SessionItem::Event(event),
            Ok(Some(Ok(WatchItem::Bookmark(version)))) => SessionItem::Bookmark(version),
            Ok(Some(Err(error))) => SessionItem::Failed(error),
            Ok(None) => SessionItem::Closed,
            Err(_) => SessionItem::Expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{warning_event, FakeWatchClient};

    #[tokio::test]
    async fn test_session_yields_events_then_closes() {
        let client = FakeWatchClient::new().with_session(vec![
            warning_event("ns1", "p1", "BackOff", ""),
            warning_event("ns1", "p2", "Failed", ""),
        ]);

        let mut session = WatchSession::open(&client, 290, "0", Duration::from_secs(30))
            .await
            .unwrap();

        assert!(session.is_young());
        assert!(matches!(session.next().await, SessionItem::Event(_)));
        assert!(matches!(session.next().await, SessionItem::Event(_)));
        assert!(matches!(session.next().await, SessionItem::Closed));
    }

    #[tokio::test]
    async fn test_session_reports_stream_errors() {
        let client = FakeWatchClient::new().with_items(vec![Err(ClientError::Api {
            status: 410,
            message: "too old resource version".to_string(),
        })]);

        let mut session = WatchSession::open(&client, 290, "0", Duration::from_secs(30))
            .await
            .unwrap();

        match session.next().await {
            SessionItem::Failed(ClientError::Api { status, .. }) => assert_eq!(status, 410),
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_failure_is_returned() {
        let client =
            FakeWatchClient::new().with_open_error(ClientError::Transport("refused".to_string()));

        let result = WatchSession::open(&client, 290, "0", Duration::from_secs(30)).await;

        assert_eq!(
            result.err(),
            Some(ClientError::Transport("refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_silent_session_expires_at_deadline() {
        let client = FakeWatchClient::new();

        let mut session = WatchSession::open(&client, 0, "0", Duration::from_millis(20))
            .await
            .unwrap();

        let item = tokio::time::timeout(Duration::from_secs(2), session.next())
            .await
            .unwrap();
        assert!(matches!(item, SessionItem::Expired));
        assert!(session.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_session_passes_bookmarks_and_resume_version() {
        let client = FakeWatchClient::new()
            .with_watch_items(vec![Ok(WatchItem::Bookmark("4711".to_string()))]);

        let mut session = WatchSession::open(&client, 290, "4700", Duration::from_secs(30))
            .await
            .unwrap();

        match session.next().await {
            SessionItem::Bookmark(version) => assert_eq!(version, "4711"),
            other => panic!("unexpected item {:?}", other),
        }
        assert_eq!(client.resource_versions(), vec!["4700"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_young_until_half_timeout() {
        let client = FakeWatchClient::new();
        let session = WatchSession::open(&client, 10, "0", Duration::from_secs(30))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(session.is_young());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!session.is_young());
    }
}
