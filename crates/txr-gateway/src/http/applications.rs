use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use txr_store::NewApplication;

use super::envelope::{ApiResponse, ApiResult, TraceResult};
use super::trace::TraceId;
use crate::app::AppState;

/// GET /application
pub async fn list(State(state): State<Arc<AppState>>, Extension(trace): Extension<TraceId>) -> ApiResult {
    let apps = state.store.list_applications().traced(&trace)?;
    Ok(ApiResponse::success("application fetched successfully", apps).traced(&trace))
}

/// POST /application: body is an array of applications.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    body: Result<Json<Vec<NewApplication>>, JsonRejection>,
) -> ApiResult {
    let Json(apps) = body.traced(&trace)?;
    let created = state
        .store
        .create_applications(apps, Some(&trace.0))
        .traced(&trace)?;
    Ok(ApiResponse::success("application created successfully", created).traced(&trace))
}

/// PUT /application/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
    body: Result<Json<NewApplication>, JsonRejection>,
) -> ApiResult {
    let Json(app) = body.traced(&trace)?;
    let updated = state.store.update_application(&id, app).traced(&trace)?;
    Ok(ApiResponse::success("application updated successfully", updated).traced(&trace))
}

/// DELETE /application/{id}: refused while sequences still reference it.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
) -> ApiResult {
    state.store.delete_application(&id).traced(&trace)?;
    Ok(ApiResponse::success("application deleted successfully", json!({ "id": id })).traced(&trace))
}
