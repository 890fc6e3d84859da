//! HTTP probe server
//!
//! - `GET /health`: 200 `{"status":"healthy"}` or 503 `{"status":"unhealthy","error":...}`
//! - `GET /ready`: 200 `{"status":"ready"}` or 503 `{"status":"not_ready"}`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::HealthStatus;
use crate::error::{EventLensError, Result};

/// Builds the probe router over shared status flags.
pub fn health_router(status: Arc<HealthStatus>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(status)
}

async fn health(State(status): State<Arc<HealthStatus>>) -> (StatusCode, Json<Value>) {
    let snapshot = status.snapshot();
    if snapshot.healthy {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": snapshot.error_message })),
        )
    }
}

async fn ready(State(status): State<Arc<HealthStatus>>) -> (StatusCode, Json<Value>) {
    if status.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready" })),
        )
    }
}

/// Serves the probe endpoints on all interfaces until `token` is cancelled.
///
/// # Errors
///
/// Returns `EventLensError::Health` when the port cannot be bound or the
/// server fails.
pub async fn run_health_server(
    port: u16,
    status: Arc<HealthStatus>,
    token: CancellationToken,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| EventLensError::Health(format!("Failed to bind {}: {}", addr, e)))?;

    serve(listener, status, token).await
}

/// Serves the probe endpoints on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    status: Arc<HealthStatus>,
    token: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| EventLensError::Health(e.to_string()))?;
    info!(address = %addr, "Health probe server listening");

    axum::serve(listener, health_router(status))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .map_err(|e| EventLensError::Health(e.to_string()))?;

    info!("Health probe server stopped");
    Ok(())
}
