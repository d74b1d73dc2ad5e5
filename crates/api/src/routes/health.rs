use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the lock coordinator is not answering.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub websocket_connections: usize,
    pub connected_users: usize,
    /// `None` when the coordinator is down.
    pub active_locks: Option<usize>,
}

/// GET /health -- returns service status and live counters.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let active_locks = state.coordinator.lock_count().await.ok();
    let status = if active_locks.is_some() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        websocket_connections: state.ws_manager.connection_count().await,
        connected_users: state.ws_manager.connected_users().await.len(),
        active_locks,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
