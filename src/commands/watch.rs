//! Watch command handler.
//!
//! Starts the probe server, connects to the cluster, wires watcher, handoff
//! queue, processor and notifier together, and runs until SIGINT/SIGTERM or
//! until a component exits on its own.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cluster::KubeClient;
use crate::config::{Config, NotifierKind};
use crate::error::{EventLensError, Result};
use crate::health::{run_health_server, HealthStatus};
use crate::lifecycle::ServiceHandle;
use crate::logs::{LogFetcher, RetrievalPolicy};
use crate::notify::{LogNotifier, Notifier, SlackNotifier};
use crate::processor::Processor;
use crate::queue::handoff_queue;
use crate::watcher::{EventFilter, EventWatcher, WatchSettings};

const SERVICE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Run the watcher service
///
/// # Arguments
///
/// * `config` - Validated configuration (consumed)
///
/// # Errors
///
/// Returns an error when initialization fails (credentials, connectivity,
/// notifier setup) or when a component finished with an error.
pub async fn run_watch(config: Config) -> Result<()> {
    let root = CancellationToken::new();
    let signals = tokio::spawn(wait_for_shutdown_signal(root.clone()));
    let health = Arc::new(HealthStatus::new());

    let health_server = if config.health.enabled {
        let status = health.clone();
        let port = config.health.port;
        Some(ServiceHandle::spawn(
            "health",
            root.child_token(),
            move |token| run_health_server(port, status, token),
        ))
    } else {
        None
    };

    let services = match start_pipeline(&config, &root).await {
        Ok(services) => services,
        Err(e) => {
            error!(error = %e, "Failed to initialize EventLens");
            health.set_healthy(false, Some(e.to_string()));
            root.cancel();
            if let Some(handle) = health_server {
                let _ = handle.join().await;
            }
            signals.abort();
            return Err(e);
        }
    };

    health.set_healthy(true, None);
    health.set_ready(true);
    info!(
        notifier = %config.notifier.kind,
        health_port = ?config.health.enabled.then_some(config.health.port),
        "EventLens is running"
    );

    let mut check = tokio::time::interval(SERVICE_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = root.cancelled() => {
                info!("Shutdown requested");
                break;
            }
            _ = check.tick() => {
                if let Some(handle) = services.iter().find(|h| h.is_finished()) {
                    warn!(service = handle.name(), "Service exited, shutting down");
                    break;
                }
            }
        }
    }

    health.set_ready(false);
    let result = shutdown(services, health_server).await;
    root.cancel();
    signals.abort();

    info!("EventLens stopped");
    result
}

/// Connects to the cluster and spawns watcher and processor.
async fn start_pipeline(config: &Config, root: &CancellationToken) -> Result<Vec<ServiceHandle>> {
    let client = KubeClient::connect(&config.cluster)
        .await
        .map_err(|e| EventLensError::Cluster(e.to_string()))?;
    let client = Arc::new(client);
    let notifier = build_notifier(config)?;

    let (sender, receiver) = handoff_queue();

    let filter = EventFilter::from_config(&config.watcher);
    info!(filter = %filter.summary(), "Configured event filter");
    let watcher = EventWatcher::new(
        client.clone(),
        filter,
        WatchSettings::from_config(&config.watcher),
        sender,
    );

    let fetcher = LogFetcher::new(
        client,
        RetrievalPolicy::from_config(&config.logs),
        config.logs.tail_lines,
    );
    let processor = Processor::from_config(&config.processing, receiver, fetcher, notifier);

    Ok(vec![
        ServiceHandle::spawn("watcher", root.child_token(), move |token| {
            watcher.run(token)
        }),
        ServiceHandle::spawn("processor", root.child_token(), move |token| {
            processor.run(token)
        }),
    ])
}

/// Builds the configured notification sink.
///
/// # Errors
///
/// Returns `EventLensError::Notify` when the Slack sink cannot be created.
pub fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match config.notifier.kind {
        NotifierKind::Log => Ok(Arc::new(LogNotifier::new())),
        NotifierKind::Slack => {
            let notifier =
                SlackNotifier::new(&config.notifier.slack, config.cluster.name.clone())
                    .map_err(|e| EventLensError::Notify(e.to_string()))?;
            Ok(Arc::new(notifier))
        }
    }
}

/// Stops the pipeline in order, then the probe server.
async fn shutdown(services: Vec<ServiceHandle>, health_server: Option<ServiceHandle>) -> Result<()> {
    let mut first_error = None;

    for handle in services.into_iter().chain(health_server) {
        let name = handle.name().to_string();
        handle.stop();
        if let Err(e) = handle.join().await {
            error!(service = %name, error = %e, "Service failed");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn wait_for_shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received interrupt");
    }

    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_notifier_defaults_to_log() {
        let notifier = build_notifier(&Config::default()).unwrap();
        assert_eq!(notifier.name(), "log");
    }

    #[test]
    fn test_build_notifier_slack() {
        let mut config = Config::default();
        config.notifier.kind = NotifierKind::Slack;
        config.notifier.slack.bot_token = Some("xoxb-test".to_string());
        config.notifier.slack.channel = Some("#alerts".to_string());

        let notifier = build_notifier(&config).unwrap();

        assert_eq!(notifier.name(), "slack");
    }

    #[test]
    fn test_build_notifier_slack_without_token_fails() {
        let mut config = Config::default();
        config.notifier.kind = NotifierKind::Slack;
        config.notifier.slack.channel = Some("#alerts".to_string());

        let err = build_notifier(&config).err().unwrap();

        assert!(err.to_string().contains("Slack bot token is required"));
    }

    #[tokio::test]
    async fn test_shutdown_reports_first_failure() {
        let ok = ServiceHandle::spawn("ok", CancellationToken::new(), |token| async move {
            token.cancelled().await;
            Ok(())
        });
        let failing = ServiceHandle::spawn("failing", CancellationToken::new(), |_| async {
            Err(anyhow::anyhow!("boom"))
        });

        let result = shutdown(vec![ok, failing], None).await;

        assert_eq!(result.unwrap_err().to_string(), "boom");
    }
}
