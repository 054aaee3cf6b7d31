//! Health check handler and response type.

use crate::constants::SERVICE_NAME;
use crate::state::AppState;
use axum::{extract::State, Json};
use mediagate_infra::QueueStats;
use std::sync::Arc;

#[derive(Debug, serde::Serialize)]
pub struct HealthCheckResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub environment: String,
    /// Backend ids in priority order
    pub backends: Vec<String>,
    pub upload_queue: QueueStats,
    pub catalog_entries: usize,
}

/// Liveness plus a snapshot of router-side state. Never calls a backend.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy",
        service: SERVICE_NAME,
        environment: state.config.server.environment.clone(),
        backends: state.gateway.backend_ids(),
        upload_queue: state.gateway.queue_stats(),
        catalog_entries: state.gateway.catalog().len(),
    })
}
