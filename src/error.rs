//! Error types for EventLens
//!
//! This module defines the crate-wide error enum, using `thiserror` for
//! ergonomic error handling. Subsystems that need finer-grained errors
//! (cluster client, log retrieval, notification sinks) define their own
//! enums and convert into [`EventLensError`] at the application boundary.

use thiserror::Error;

/// Main error type for EventLens operations
///
/// This enum encompasses the errors that can stop the service from starting
/// or that surface at the application boundary: configuration loading,
/// cluster connectivity, notification delivery, and the probe server.
#[derive(Error, Debug)]
pub enum EventLensError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cluster client initialization or connectivity errors
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// Notification sink errors
    #[error("Notification error: {0}")]
    Notify(String),

    /// Health probe server errors
    #[error("Health server error: {0}")]
    Health(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for EventLens operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
