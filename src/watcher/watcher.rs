//! Event watch loop
//!
//! [`EventWatcher`] keeps a watch session over all cluster events open for
//! the lifetime of the service:
//! 1. Opens a session
//! 2. Normalizes and classifies every received event
//! 3. Hands actionable events to the processor through the handoff queue
//! 4. Reconnects when the session times out, or after a fixed backoff when
//!    the session fails or the server closes it early
//!
//! Each session resumes from the last resource version seen on an event or
//! bookmark. Only the first session, and the first one after the server
//! reports that version as expired (410 Gone), start from `"0"`.
//!
//! Transient failures never end the loop. It returns when its cancellation
//! token fires or when the processor side of the queue is gone.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use k8s_openapi::api::core::v1::Event;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::filter::EventFilter;
use super::session::{SessionItem, WatchSession};
use crate::cluster::{ClientError, EventWatchClient};
use crate::config::WatcherConfig;
use crate::error::Result;
use crate::events::NormalizedEvent;
use crate::metrics::{self, ReconnectReason};
use crate::queue::EventSender;

/// Watch loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Not started yet
    Idle,
    /// A session is open and events are being read
    Streaming,
    /// Opening a new session
    Reconnecting,
    /// Waiting out the retry delay after a failure
    Backoff,
    /// The loop has returned
    Stopped,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchState::Idle => "idle",
            WatchState::Streaming => "streaming",
            WatchState::Reconnecting => "reconnecting",
            WatchState::Backoff => "backoff",
            WatchState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Shared view of a watcher's current state.
///
/// Stays valid after the watcher itself has been moved into its task.
#[derive(Debug, Clone)]
pub struct WatchStateHandle(Arc<Mutex<WatchState>>);

impl WatchStateHandle {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(WatchState::Idle)))
    }

    /// Returns the current state.
    pub fn get(&self) -> WatchState {
        match self.0.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set(&self, next: WatchState) {
        let mut state = match self.0.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = *state;
        if current != next {
            debug!(from = %current, to = %next, "Watch state transition");
            *state = next;
        }
    }
}

/// Timing parameters of the watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Server-side session timeout in seconds
    pub timeout_secs: u32,
    /// Extra time after the timeout before the session is abandoned
    pub session_grace: Duration,
    /// Delay before reconnecting after a failure
    pub backoff: Duration,
}

impl WatchSettings {
    /// Builds settings from validated configuration.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self {
            timeout_secs: config.timeout_seconds,
            session_grace: Duration::from_secs(config.session_grace_seconds),
            backoff: Duration::from_secs(config.backoff_seconds),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self::from_config(&WatcherConfig::default())
    }
}

/// Resource version that asks the API server for its current state.
const INITIAL_RESOURCE_VERSION: &str = "0";

/// How a session ended.
enum SessionOutcome {
    /// Expected end of session; reconnect right away
    Expired,
    /// The server closed the session long before its timeout
    ClosedEarly(Duration),
    /// The resume version is no longer available; resync from scratch
    Gone(ClientError),
    /// The session failed; reconnect after the backoff
    Failed(ReconnectReason, ClientError),
    /// The processor is gone
    QueueClosed,
}

/// Long-running watcher over all cluster events.
///
/// # Delivery
///
/// Within one session every actionable event is enqueued exactly once, in
/// receipt order. A reconnect resumes from the last resource version seen,
/// so the next session neither replays nor skips events. After a 410 Gone
/// the watcher resyncs from `"0"`; events already seen may then be
/// delivered again, and consumers must tolerate that duplicate burst.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use eventlens::cluster::KubeClient;
/// use eventlens::config::ClusterConfig;
/// use eventlens::queue::handoff_queue;
/// use eventlens::watcher::{EventFilter, EventWatcher, WatchSettings};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = KubeClient::connect(&ClusterConfig::default()).await?;
/// let (tx, _rx) = handoff_queue();
/// let watcher = EventWatcher::new(
///     Arc::new(client),
///     EventFilter::default(),
///     WatchSettings::default(),
///     tx,
/// );
/// watcher.run(CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct EventWatcher {
    client: Arc<dyn EventWatchClient>,
    filter: EventFilter,
    settings: WatchSettings,
    queue: EventSender,
    state: WatchStateHandle,
}

impl EventWatcher {
    /// Creates a watcher.
    ///
    /// # Arguments
    ///
    /// * `client` - Connected cluster client
    /// * `filter` - Actionable-event classification
    /// * `settings` - Session timeout and backoff
    /// * `queue` - Producer half of the handoff queue
    pub fn new(
        client: Arc<dyn EventWatchClient>,
        filter: EventFilter,
        settings: WatchSettings,
        queue: EventSender,
    ) -> Self {
        Self {
            client,
            filter,
            settings,
            queue,
            state: WatchStateHandle::new(),
        }
    }

    /// Current loop state.
    pub fn state(&self) -> WatchState {
        self.state.get()
    }

    /// Shared state view that outlives `run`.
    pub fn state_handle(&self) -> WatchStateHandle {
        self.state.clone()
    }

    /// Runs the watch loop until `token` is cancelled or the queue closes.
    ///
    /// Session timeouts reconnect immediately. API and stream failures, and
    /// sessions the server closes before half their timeout, are logged and
    /// retried after the configured backoff. The token is raced against
    /// every stream read and every backoff sleep.
    ///
    /// # Errors
    ///
    /// Never fails once started; the `Result` lets it run behind a
    /// [`crate::lifecycle::ServiceHandle`].
    pub async fn run(self, token: CancellationToken) -> Result<()> {
        info!(
            filters = %self.filter.summary(),
            timeout_secs = self.settings.timeout_secs,
            backoff_secs = self.settings.backoff.as_secs_f64(),
            "Starting event watcher"
        );

        let mut resume_from = String::from(INITIAL_RESOURCE_VERSION);

        loop {
            if token.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                _ = token.cancelled() => break,
                outcome = self.run_session(&mut resume_from) => outcome,
            };

            match outcome {
                SessionOutcome::QueueClosed => {
                    info!("Handoff queue closed, stopping event watcher");
                    break;
                }
                SessionOutcome::Expired => {
                    debug!("Watch session timed out, reconnecting");
                    metrics::record_reconnect(ReconnectReason::Timeout);
                    self.state.set(WatchState::Reconnecting);
                }
                SessionOutcome::Gone(err) => {
                    warn!(
                        resource_version = %resume_from,
                        error = %err,
                        "Resource version expired, resyncing from current state"
                    );
                    metrics::record_reconnect(ReconnectReason::Gone);
                    resume_from = String::from(INITIAL_RESOURCE_VERSION);
                    self.state.set(WatchState::Reconnecting);
                }
                SessionOutcome::ClosedEarly(elapsed) => {
                    warn!(
                        elapsed_secs = elapsed.as_secs_f64(),
                        timeout_secs = self.settings.timeout_secs,
                        retry_in_secs = self.settings.backoff.as_secs_f64(),
                        "Watch session closed early, retrying after backoff"
                    );
                    metrics::record_reconnect(ReconnectReason::ClosedEarly);
                    if !self.back_off(&token).await {
                        break;
                    }
                }
                SessionOutcome::Failed(reason, err) => {
                    error!(
                        reason = reason.as_str(),
                        error = %err,
                        retry_in_secs = self.settings.backoff.as_secs_f64(),
                        "Watch session failed, retrying after backoff"
                    );
                    metrics::record_reconnect(reason);
                    if !self.back_off(&token).await {
                        break;
                    }
                }
            }
        }

        self.state.set(WatchState::Stopped);
        info!("Event watcher stopped");
        Ok(())
    }

    /// Waits out the backoff. Returns false when cancelled meanwhile.
    async fn back_off(&self, token: &CancellationToken) -> bool {
        self.state.set(WatchState::Backoff);

        tokio::select! {
            _ = token.cancelled() => return false,
            _ = tokio::time::sleep(self.settings.backoff) => {}
        }

        self.state.set(WatchState::Reconnecting);
        true
    }

    /// Streams one session, advancing `resume_from` past every event and
    /// bookmark it yields.
    async fn run_session(&self, resume_from: &mut String) -> SessionOutcome {
        let resyncing = resume_from.as_str() == INITIAL_RESOURCE_VERSION;

        let mut session = match WatchSession::open(
            self.client.as_ref(),
            self.settings.timeout_secs,
            resume_from.as_str(),
            self.settings.session_grace,
        )
        .await
        {
            Ok(session) => session,
            Err(err) if err.is_gone() && !resyncing => return SessionOutcome::Gone(err),
            Err(err) => return SessionOutcome::Failed(ReconnectReason::OpenFailed, err),
        };

        self.state.set(WatchState::Streaming);
        debug!(resource_version = %resume_from, "Watch session opened");

        loop {
            match session.next().await {
                SessionItem::Event(raw) => {
                    if let Some(version) = raw.metadata.resource_version.as_ref() {
                        resume_from.clone_from(version);
                    }
                    if !self.dispatch(&raw) {
                        return SessionOutcome::QueueClosed;
                    }
                }
                SessionItem::Bookmark(version) => {
                    debug!(resource_version = %version, "Watch bookmark");
                    *resume_from = version;
                }
                SessionItem::Closed if session.is_young() => {
                    return SessionOutcome::ClosedEarly(session.elapsed())
                }
                SessionItem::Closed | SessionItem::Expired => return SessionOutcome::Expired,
                SessionItem::Failed(err)
                    if err.is_gone() && resume_from.as_str() != INITIAL_RESOURCE_VERSION =>
                {
                    return SessionOutcome::Gone(err)
                }
                SessionItem::Failed(err @ ClientError::Api { .. }) => {
                    return SessionOutcome::Failed(ReconnectReason::ApiError, err)
                }
                SessionItem::Failed(err) => {
                    return SessionOutcome::Failed(ReconnectReason::StreamError, err)
                }
            }
        }
    }

    /// Classifies one raw event. Returns false when the queue is closed.
    fn dispatch(&self, raw: &Event) -> bool {
        metrics::record_event_received();
        let event = NormalizedEvent::from_raw(raw);

        if !self.filter.should_process(&event) {
            debug!(
                event_type = %event.event_type,
                reason = %event.reason,
                namespace = %event.involved_object.namespace,
                name = %event.involved_object.name,
                "Discarding non-actionable event"
            );
            return true;
        }

        debug!(
            event_type = %event.event_type,
            reason = %event.reason,
            namespace = %event.involved_object.namespace,
            name = %event.involved_object.name,
            "Enqueueing actionable event"
        );

        match self.queue.send(event) {
            Ok(()) => {
                metrics::record_event_enqueued();
                true
            }
            Err(_) => false,
        }
    }
}
