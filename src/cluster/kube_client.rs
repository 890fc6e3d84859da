//! Production cluster client on top of `kube`.

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Event, Pod, PodSpec};
use kube::api::{LogParams, WatchEvent, WatchParams};
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use tracing::{debug, info};

use super::client::{ClientError, EventWatchClient, PodLogClient, RawEventStream, WatchItem};
use crate::config::ClusterConfig;
use crate::logs::TailLines;

impl From<kube::Error> for ClientError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => ClientError::from_status(resp.code, &resp.message, false),
            other => ClientError::Transport(other.to_string()),
        }
    }
}

/// Cluster client backed by a `kube::Client`.
///
/// Cloning is cheap; every clone shares the underlying connection pool, but
/// each API call is its own request. The watcher and the log fetcher hold
/// separate clones.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Loads credentials and verifies the API server is reachable.
    ///
    /// Uses the in-cluster service account when `settings.in_cluster` is set,
    /// otherwise the local kubeconfig (optionally a specific context).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` when credentials cannot be loaded and
    /// `ClientError::Transport`/`ClientError::Api` when the API server cannot
    /// be reached. Callers treat any error here as fatal.
    pub async fn connect(settings: &ClusterConfig) -> Result<Self, ClientError> {
        let config = if settings.in_cluster {
            debug!("Loading in-cluster Kubernetes configuration");
            Config::incluster().map_err(|e| ClientError::Config(e.to_string()))?
        } else {
            debug!(context = ?settings.context, "Loading kubeconfig");
            let options = KubeConfigOptions {
                context: settings.context.clone(),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .map_err(|e| ClientError::Config(e.to_string()))?
        };

        let client = Client::try_from(config).map_err(|e| ClientError::Config(e.to_string()))?;
        let version = client.apiserver_version().await?;

        info!(
            server_version = %version.git_version,
            in_cluster = settings.in_cluster,
            "Connected to Kubernetes API server"
        );

        Ok(Self { client })
    }

    /// Wraps an already constructed `kube::Client`.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventWatchClient for KubeClient {
    async fn stream_events(
        &self,
        timeout_secs: u32,
        resource_version: &str,
    ) -> Result<RawEventStream, ClientError> {
        let api: Api<Event> = Api::all(self.client.clone());
        let params = WatchParams::default()
            .timeout(timeout_secs);

        let stream = api.watch(&params, resource_version).await?;

        Ok(stream
            .filter_map(|item| async move {
                match item {
                    Ok(WatchEvent::Added(event))
                    | Ok(WatchEvent::Modified(event))
                    | Ok(WatchEvent::Deleted(event)) => Some(Ok(WatchItem::Event(Box::new(event)))),
                    Ok(WatchEvent::Bookmark(bookmark)) => {
                        Some(Ok(WatchItem::Bookmark(bookmark.metadata.resource_version)))
                    }
                    Ok(WatchEvent::Error(resp)) => Some(Err(ClientError::Api {
                        status: resp.code,
                        message: resp.message,
                    })),
                    Err(err) => Some(Err(ClientError::from(err))),
                }
            })
            .boxed())
    }
}

#[async_trait]
impl PodLogClient for KubeClient {
    async fn read_container_log(
        &self,
        pod: &str,
        namespace: &str,
        container: &str,
        tail_lines: TailLines,
        previous: bool,
    ) -> Result<String, ClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            tail_lines: Some(i64::from(tail_lines.get())),
            previous,
            ..Default::default()
        };

        api.logs(pod, &params).await.map_err(|err| match err {
            kube::Error::Api(resp) => ClientError::from_status(resp.code, &resp.message, previous),
            other => ClientError::from(other),
        })
    }

    async fn list_pod_containers(
        &self,
        pod: &str,
        namespace: &str,
    ) -> Result<Vec<String>, ClientError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let found = api
            .get_opt(pod)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("pod {}/{}", namespace, pod)))?;

        Ok(container_names(found.spec))
    }
}

/// Init containers first, then regular containers, each in spec order.
fn container_names(spec: Option<PodSpec>) -> Vec<String> {
    let Some(spec) = spec else {
        return Vec::new();
    };

    spec.init_containers
        .unwrap_or_default()
        .into_iter()
        .chain(spec.containers)
        .map(|c| c.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Container;

    fn container(name: &str) -> Container {
        Container {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_container_names_lists_init_containers_first() {
        let spec = PodSpec {
            init_containers: Some(vec![container("migrate"), container("wait-db")]),
            containers: vec![container("app"), container("proxy")],
            ..Default::default()
        };

        assert_eq!(
            container_names(Some(spec)),
            vec!["migrate", "wait-db", "app", "proxy"]
        );
    }

    #[test]
    fn test_container_names_without_init_containers() {
        let spec = PodSpec {
            containers: vec![container("app")],
            ..Default::default()
        };

        assert_eq!(container_names(Some(spec)), vec!["app"]);
    }

    #[test]
    fn test_container_names_without_spec() {
        assert!(container_names(None).is_empty());
    }
}
