use axum::extract::State;
use serde_json::json;
use std::sync::Arc;

use super::envelope::ApiResponse;
use crate::app::AppState;

/// GET / and GET /health: liveness probe, no trace id required.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> ApiResponse {
    ApiResponse::success(
        "TXR is healthy",
        json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "port": state.config.gateway.port,
            "uptime_secs": state.started_at.elapsed().as_secs(),
            "scheduled_sequences": state.scheduler.scheduled().len(),
        }),
    )
}
