//! Per-container log bundle attached to an incident

use serde::Serialize;

/// Retrieved logs for one container.
///
/// `logs` is `None` when no log source was available for the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerLog {
    /// Container name as listed in the pod spec
    pub container: String,
    /// Log text, or `None` when nothing was found
    pub logs: Option<String>,
}

/// Ordered collection of container logs for a single event.
///
/// Entries keep the order of the pod's container list at retrieval time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContainerLogBundle {
    entries: Vec<ContainerLog>,
}

impl ContainerLogBundle {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry for `container`.
    pub fn push(&mut self, container: impl Into<String>, logs: Option<String>) {
        self.entries.push(ContainerLog {
            container: container.into(),
            logs,
        });
    }

    /// Returns the entries in container-list order.
    pub fn entries(&self) -> &[ContainerLog] {
        &self.entries
    }

    /// Returns the logs recorded for `container`, if it has an entry.
    pub fn get(&self, container: &str) -> Option<&ContainerLog> {
        self.entries.iter().find(|e| e.container == container)
    }

    /// Returns the container names in order.
    pub fn containers(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.container.as_str()).collect()
    }

    /// Number of containers in the bundle.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the bundle has no containers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when at least one container has non-blank log text.
    pub fn has_logs(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.logs.as_deref().is_some_and(|l| !l.trim().is_empty()))
    }

    /// Renders the bundle as a plain-text attachment.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventlens::events::ContainerLogBundle;
    ///
    /// let mut bundle = ContainerLogBundle::new();
    /// bundle.push("app", Some("boom".to_string()));
    /// bundle.push("sidecar", None);
    ///
    /// let text = bundle.render();
    /// assert!(text.contains("=== container: app ===\nboom"));
    /// assert!(text.contains("=== container: sidecar ===\n<no logs found>"));
    /// ```
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let body = entry.logs.as_deref().unwrap_or("<no logs found>");
                format!("=== container: {} ===\n{}", entry.container, body.trim_end())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl IntoIterator for ContainerLogBundle {
    type Item = ContainerLog;
    type IntoIter = std::vec::IntoIter<ContainerLog>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ContainerLogBundle {
    type Item = &'a ContainerLog;
    type IntoIter = std::slice::Iter<'a, ContainerLog>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
