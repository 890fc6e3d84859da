//! Configuration management for EventLens
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{EventLensError, Result};
use crate::logs::TailLines;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure for EventLens
///
/// Every section has defaults, so an empty file (or no file at all) yields
/// a working in-cluster configuration that logs incidents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cluster connection
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Event watch loop
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// Log retrieval
    #[serde(default)]
    pub logs: LogRetrievalConfig,
    /// Processing loop
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Probe server
    #[serde(default)]
    pub health: HealthConfig,
    /// Notification sink
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Service logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cluster connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Optional cluster label shown in notifications
    #[serde(default)]
    pub name: Option<String>,

    /// Use the pod's service account; otherwise infer from kubeconfig
    #[serde(default = "default_in_cluster")]
    pub in_cluster: bool,

    /// Kubeconfig context to use when not running in-cluster
    #[serde(default)]
    pub context: Option<String>,
}

fn default_in_cluster() -> bool {
    true
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: None,
            in_cluster: default_in_cluster(),
            context: None,
        }
    }
}

/// Event watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Server-side watch session timeout in seconds
    #[serde(default = "default_watch_timeout")]
    pub timeout_seconds: u32,

    /// Extra seconds after the timeout before a silent session is abandoned
    #[serde(default = "default_session_grace")]
    pub session_grace_seconds: u64,

    /// Delay before reconnecting after a failed session, in seconds
    #[serde(default = "default_backoff")]
    pub backoff_seconds: u64,

    /// Event types that trigger log retrieval and notification
    #[serde(default = "default_actionable_types")]
    pub actionable_types: Vec<String>,
}

fn default_watch_timeout() -> u32 {
    290
}

fn default_session_grace() -> u64 {
    30
}

fn default_backoff() -> u64 {
    10
}

fn default_actionable_types() -> Vec<String> {
    [
        "Warning",
        "Error",
        "Failed",
        "Evicted",
        "Unhealthy",
        "BackOff",
        "FailedScheduling",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_watch_timeout(),
            session_grace_seconds: default_session_grace(),
            backoff_seconds: default_backoff(),
            actionable_types: default_actionable_types(),
        }
    }
}

/// Log retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRetrievalConfig {
    /// Trailing lines read per container
    #[serde(default)]
    pub tail_lines: TailLines,

    /// Reasons whose logs are read from the previous container instance
    #[serde(default = "default_restart_reasons")]
    pub restart_reasons: Vec<String>,

    /// Message substring marking a liveness-probe failure
    #[serde(default = "default_liveness_marker")]
    pub liveness_marker: String,
}

fn default_restart_reasons() -> Vec<String> {
    vec!["BackOff".to_string(), "Failed".to_string()]
}

fn default_liveness_marker() -> String {
    "Liveness probe failed".to_string()
}

impl Default for LogRetrievalConfig {
    fn default() -> Self {
        Self {
            tail_lines: TailLines::default(),
            restart_reasons: default_restart_reasons(),
            liveness_marker: default_liveness_marker(),
        }
    }
}

/// Processing loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Longest wait on the queue before the stop signal is re-checked
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Probe server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Serve `/health` and `/ready`
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,

    /// Listen port
    #[serde(default = "default_health_port")]
    pub port: u16,
}

fn default_health_enabled() -> bool {
    true
}

fn default_health_port() -> u16 {
    8080
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            port: default_health_port(),
        }
    }
}

/// Which sink receives incidents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Write incidents to the service log
    #[default]
    Log,
    /// Post incidents to Slack
    Slack,
}

impl FromStr for NotifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(NotifierKind::Log),
            "slack" => Ok(NotifierKind::Slack),
            other => Err(format!("unknown notifier: {}", other)),
        }
    }
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifierKind::Log => write!(f, "log"),
            NotifierKind::Slack => write!(f, "slack"),
        }
    }
}

/// Notification sink configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Selected sink
    #[serde(default)]
    pub kind: NotifierKind,

    /// Slack settings, used when `kind` is `slack`
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Slack Web API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (prefer env var SLACK_BOT_TOKEN)
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Channel name or ID
    #[serde(default)]
    pub channel: Option<String>,

    /// Web API base URL
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_slack_timeout")]
    pub timeout_seconds: u64,
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_slack_timeout() -> u64 {
    30
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel: None,
            api_base: default_slack_api_base(),
            timeout_seconds: default_slack_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default = "default_json_logs")]
    pub json_format: bool,

    /// Log file path (if None, STDOUT only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logs() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: default_json_logs(),
            file_path: None,
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {}: {}", name, raw);
            None
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => {
            tracing::warn!("Invalid {}: {}", name, raw);
            None
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_list(name: &str) -> Option<Vec<String>> {
    let values = split_list(&std::env::var(name).ok()?);
    if values.is_empty() {
        tracing::warn!("Ignoring empty {}", name);
        None
    } else {
        Some(values)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration. Call
    /// [`Config::validate`] before using it.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EventLensError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| EventLensError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // Cluster
        if let Some(name) = env_string("EVENTLENS_CLUSTER_NAME") {
            self.cluster.name = Some(name);
        }

        if let Some(in_cluster) = env_bool("EVENTLENS_IN_CLUSTER") {
            self.cluster.in_cluster = in_cluster;
        }

        if let Some(context) = env_string("EVENTLENS_KUBE_CONTEXT") {
            self.cluster.context = Some(context);
        }

        // Watcher
        if let Some(timeout) = env_parse("EVENTLENS_WATCH_TIMEOUT_SECONDS") {
            self.watcher.timeout_seconds = timeout;
        }

        if let Some(backoff) = env_parse("EVENTLENS_BACKOFF_SECONDS") {
            self.watcher.backoff_seconds = backoff;
        }

        if let Some(types) = env_list("EVENTLENS_ACTIONABLE_TYPES") {
            tracing::debug!(?types, "Env override: EVENTLENS_ACTIONABLE_TYPES");
            self.watcher.actionable_types = types;
        }

        // Log retrieval
        if let Some(tail) = env_parse::<u32>("EVENTLENS_POD_LOG_TAIL_LINES") {
            match TailLines::new(tail) {
                Ok(tail_lines) => self.logs.tail_lines = tail_lines,
                Err(e) => tracing::warn!("Invalid EVENTLENS_POD_LOG_TAIL_LINES: {}", e),
            }
        }

        if let Some(reasons) = env_list("EVENTLENS_RESTART_REASONS") {
            tracing::debug!(?reasons, "Env override: EVENTLENS_RESTART_REASONS");
            self.logs.restart_reasons = reasons;
        }

        // Health
        if let Some(port) = env_parse("EVENTLENS_HEALTH_CHECK_PORT") {
            self.health.port = port;
        }

        // Logging
        if let Some(level) = env_string("EVENTLENS_LOG_LEVEL") {
            self.logging.level = level.trim().to_lowercase();
        }

        if let Some(json) = env_bool("EVENTLENS_JSON_LOGS") {
            self.logging.json_format = json;
        }

        if let Some(file) = env_string("EVENTLENS_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(file));
        }

        // Notifier
        if let Some(kind) = env_parse("EVENTLENS_NOTIFIER") {
            self.notifier.kind = kind;
        }

        if let Some(token) = env_string("SLACK_BOT_TOKEN") {
            self.notifier.slack.bot_token = Some(token);
        }

        if let Some(channel) = env_string("SLACK_CHANNEL") {
            self.notifier.slack.channel = Some(channel);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }

        if let crate::cli::Commands::Watch {
            dry_run,
            actionable_types,
            json_logs,
            log_file,
        } = &cli.command
        {
            if *dry_run {
                self.notifier.kind = NotifierKind::Log;
            }

            if let Some(types) = actionable_types {
                self.watcher.actionable_types = split_list(types);
            }

            if *json_logs {
                self.logging.json_format = true;
            }

            if let Some(path) = log_file {
                self.logging.file_path = Some(path.clone());
            }
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if !(1..=294).contains(&self.watcher.timeout_seconds) {
            return Err(EventLensError::Config(format!(
                "watcher.timeout_seconds must be between 1 and 294, got {}",
                self.watcher.timeout_seconds
            ))
            .into());
        }

        if !(1..=300).contains(&self.watcher.backoff_seconds) {
            return Err(EventLensError::Config(format!(
                "watcher.backoff_seconds must be between 1 and 300, got {}",
                self.watcher.backoff_seconds
            ))
            .into());
        }

        if self.watcher.session_grace_seconds > 300 {
            return Err(EventLensError::Config(
                "watcher.session_grace_seconds must be at most 300".to_string(),
            )
            .into());
        }

        if self.watcher.actionable_types.is_empty() {
            return Err(EventLensError::Config(
                "watcher.actionable_types cannot be empty".to_string(),
            )
            .into());
        }

        if self.logs.liveness_marker.trim().is_empty() {
            return Err(
                EventLensError::Config("logs.liveness_marker cannot be empty".to_string()).into(),
            );
        }

        if !(10..=1000).contains(&self.processing.poll_interval_ms) {
            return Err(EventLensError::Config(format!(
                "processing.poll_interval_ms must be between 10 and 1000, got {}",
                self.processing.poll_interval_ms
            ))
            .into());
        }

        if !(1024..=65534).contains(&self.health.port) {
            return Err(EventLensError::Config(format!(
                "health.port must be between 1024 and 65534, got {}",
                self.health.port
            ))
            .into());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(EventLensError::Config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            ))
            .into());
        }

        if self.notifier.kind == NotifierKind::Slack {
            let slack = &self.notifier.slack;
            if slack.bot_token.as_deref().unwrap_or("").is_empty() {
                return Err(EventLensError::Config(
                    "Slack notifier requires a bot token (set SLACK_BOT_TOKEN)".to_string(),
                )
                .into());
            }

            if slack.channel.as_deref().unwrap_or("").is_empty() {
                return Err(EventLensError::Config(
                    "Slack notifier requires a channel (set SLACK_CHANNEL)".to_string(),
                )
                .into());
            }

            url::Url::parse(&slack.api_base).map_err(|e| {
                EventLensError::Config(format!(
                    "Invalid notifier.slack.api_base {}: {}",
                    slack.api_base, e
                ))
            })?;

            if slack.timeout_seconds == 0 {
                return Err(EventLensError::Config(
                    "notifier.slack.timeout_seconds must be greater than 0".to_string(),
                )
                .into());
            }
        }

        Ok(())
    }
}
