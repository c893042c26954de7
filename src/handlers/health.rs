use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::debug;

use crate::AppState;
use crate::models::HealthResponse;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let rooms = app_state.collab.registry().len().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("Service is ready, {} active session(s)", rooms),
    })
}
