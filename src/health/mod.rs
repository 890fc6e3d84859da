//! Liveness and readiness probes
//!
//! [`HealthStatus`] holds the flags the probes report. It starts healthy
//! but not ready; startup flips it to ready once every component runs, or
//! to unhealthy with an error message when initialization fails. Watch
//! reconnects never touch it.
//!
//! [`server`] exposes the flags over HTTP for the kubelet.

pub mod server;

use std::sync::RwLock;

use serde::Serialize;

pub use server::{health_router, run_health_server};

#[derive(Debug, Clone)]
struct Flags {
    healthy: bool,
    ready: bool,
    error_message: Option<String>,
}

/// Point-in-time copy of the probe flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Liveness
    pub healthy: bool,
    /// Readiness
    pub ready: bool,
    /// Reason for being unhealthy, if any
    pub error_message: Option<String>,
}

/// Thread-safe probe flags shared between startup code and the probe server.
///
/// # Examples
///
/// ```
/// use eventlens::health::HealthStatus;
///
/// let status = HealthStatus::new();
/// assert!(status.is_healthy());
/// assert!(!status.is_ready());
///
/// status.set_healthy(false, Some("cannot reach API server".to_string()));
/// assert_eq!(status.error_message().as_deref(), Some("cannot reach API server"));
/// ```
#[derive(Debug)]
pub struct HealthStatus {
    flags: RwLock<Flags>,
}

impl HealthStatus {
    /// Creates status flags: healthy, not ready.
    pub fn new() -> Self {
        Self {
            flags: RwLock::new(Flags {
                healthy: true,
                ready: false,
                error_message: None,
            }),
        }
    }

    /// Sets liveness and the accompanying error message.
    pub fn set_healthy(&self, healthy: bool, error_message: Option<String>) {
        let mut flags = match self.flags.write() {
            Ok(flags) => flags,
            Err(poisoned) => poisoned.into_inner(),
        };
        flags.healthy = healthy;
        flags.error_message = error_message;
    }

    /// Sets readiness.
    pub fn set_ready(&self, ready: bool) {
        let mut flags = match self.flags.write() {
            Ok(flags) => flags,
            Err(poisoned) => poisoned.into_inner(),
        };
        flags.ready = ready;
    }

    /// Returns a copy of all flags.
    pub fn snapshot(&self) -> HealthSnapshot {
        let flags = match self.flags.read() {
            Ok(flags) => flags.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        HealthSnapshot {
            healthy: flags.healthy,
            ready: flags.ready,
            error_message: flags.error_message,
        }
    }

    /// Liveness.
    pub fn is_healthy(&self) -> bool {
        self.snapshot().healthy
    }

    /// Readiness.
    pub fn is_ready(&self) -> bool {
        self.snapshot().ready
    }

    /// Reason for being unhealthy, if any.
    pub fn error_message(&self) -> Option<String> {
        self.snapshot().error_message
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}
