//! Fetch-logs command handler.
//!
//! Runs the log retrieval engine once for a single pod, the same way the
//! processor would for an event with the given reason and message, and
//! prints the rendered bundle.

use std::sync::Arc;

use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::warn;

use crate::cluster::KubeClient;
use crate::config::Config;
use crate::error::{EventLensError, Result};
use crate::events::NormalizedEvent;
use crate::logs::{LogFetchError, LogFetcher, RetrievalPolicy, TailLines};

/// Arguments of the `fetch-logs` command
#[derive(Debug, Clone)]
pub struct FetchLogsArgs {
    /// Pod namespace
    pub namespace: String,
    /// Pod name
    pub pod: String,
    /// Event reason driving the previous/current decision
    pub reason: String,
    /// Event message
    pub message: String,
    /// Tail override
    pub tail: Option<u32>,
}

/// Fetch and print the logs of one pod
///
/// # Arguments
///
/// * `config` - Validated configuration (consumed)
/// * `args` - Target pod and event details
///
/// # Errors
///
/// Returns an error when the tail override is out of range, the cluster
/// cannot be reached, or the pod's containers cannot be listed.
pub async fn run_fetch_logs(config: Config, args: FetchLogsArgs) -> Result<()> {
    let tail_lines = match args.tail {
        Some(tail) => TailLines::new(tail).map_err(|e| EventLensError::Config(e.to_string()))?,
        None => config.logs.tail_lines,
    };

    let client = KubeClient::connect(&config.cluster)
        .await
        .map_err(|e| EventLensError::Cluster(e.to_string()))?;
    let fetcher = LogFetcher::new(
        Arc::new(client),
        RetrievalPolicy::from_config(&config.logs),
        tail_lines,
    );

    let event = synthetic_event(&args);
    let rendered = fetch_and_render(&fetcher, &event, tail_lines).await?;
    println!("{}", rendered);

    Ok(())
}

/// Builds the event the engine sees for the given pod.
pub fn synthetic_event(args: &FetchLogsArgs) -> NormalizedEvent {
    let raw = Event {
        metadata: ObjectMeta {
            name: Some(format!("{}.fetch-logs", args.pod)),
            namespace: Some(args.namespace.clone()),
            ..Default::default()
        },
        type_: Some("Warning".to_string()),
        reason: Some(args.reason.clone()),
        message: Some(args.message.clone()),
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(args.pod.clone()),
            namespace: Some(args.namespace.clone()),
            ..Default::default()
        },
        ..Default::default()
    };
    NormalizedEvent::from_raw(&raw)
}

/// Runs the engine and renders the result for the terminal.
///
/// Partial failures are reported as warnings and the partial bundle is
/// still rendered.
///
/// # Errors
///
/// Returns `EventLensError::Cluster` when the pod's containers cannot be
/// listed.
pub async fn fetch_and_render(
    fetcher: &LogFetcher,
    event: &NormalizedEvent,
    tail_lines: TailLines,
) -> Result<String> {
    let object = &event.involved_object;
    let bundle = match fetcher.fetch_with_tail(event, tail_lines).await {
        Ok(bundle) => bundle,
        Err(err @ LogFetchError::Partial { .. }) => {
            warn!(error = %err, "Some containers could not be read");
            err.into_bundle()
        }
        Err(err @ LogFetchError::Pod(_)) => {
            return Err(EventLensError::Cluster(err.to_string()).into());
        }
    };

    if bundle.is_empty() {
        return Ok(format!(
            "No containers found for pod {}/{}",
            object.namespace, object.name
        ));
    }

    Ok(bundle.render())
}
