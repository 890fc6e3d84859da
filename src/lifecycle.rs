//! Start, stop and join for long-running components
//!
//! Every loop in the service runs as its own tokio task behind a
//! [`ServiceHandle`]. Stopping cancels the component's token; the loop
//! observes it cooperatively and returns.

use std::future::Future;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::Result;

/// Handle to a spawned long-running component.
///
/// # Examples
///
/// ```
/// use eventlens::lifecycle::ServiceHandle;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test::block_on(async {
/// let handle = ServiceHandle::spawn("idle", CancellationToken::new(), |token| async move {
///     token.cancelled().await;
///     Ok(())
/// });
/// handle.stop();
/// handle.stop();
/// assert!(handle.join().await.is_ok());
/// # });
/// ```
#[derive(Debug)]
pub struct ServiceHandle {
    name: String,
    token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl ServiceHandle {
    /// Spawns a component on the current runtime.
    ///
    /// # Arguments
    ///
    /// * `name` - Component name used in logs
    /// * `token` - Stop signal for this component
    /// * `run` - Builds the component's future from a clone of `token`
    pub fn spawn<F, Fut>(name: impl Into<String>, token: CancellationToken, run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        debug!(service = %name, "Starting service");
        let task = tokio::spawn(run(token.clone()));

        Self { name, token, task }
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests the component to stop. Idempotent.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!(service = %self.name, "Stopping service");
        }
        self.token.cancel();
    }

    /// Whether stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the component's task has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the component to return.
    ///
    /// # Errors
    ///
    /// Returns the component's own error, or an error when the task
    /// panicked or was aborted.
    pub async fn join(self) -> Result<()> {
        let name = self.name;
        match self.task.await {
            Ok(result) => {
                debug!(service = %name, ok = result.is_ok(), "Service finished");
                result
            }
            Err(e) => Err(anyhow!("Service {} terminated abnormally: {}", name, e)),
        }
    }
}
