use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use txr_store::NewJobType;

use super::envelope::{ApiResponse, ApiResult, TraceResult};
use super::trace::TraceId;
use crate::app::AppState;

/// GET /job-type
pub async fn list(State(state): State<Arc<AppState>>, Extension(trace): Extension<TraceId>) -> ApiResult {
    let job_types = state.store.list_job_types().traced(&trace)?;
    Ok(ApiResponse::success("job type fetched successfully", job_types).traced(&trace))
}

/// POST /job-type: body is an array of job types.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    body: Result<Json<Vec<NewJobType>>, JsonRejection>,
) -> ApiResult {
    let Json(job_types) = body.traced(&trace)?;
    let created = state
        .store
        .create_job_types(job_types, Some(&trace.0))
        .traced(&trace)?;
    Ok(ApiResponse::success("job type created successfully", created).traced(&trace))
}

/// PUT /job-type/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
    body: Result<Json<NewJobType>, JsonRejection>,
) -> ApiResult {
    let Json(job_type) = body.traced(&trace)?;
    let updated = state.store.update_job_type(&id, job_type).traced(&trace)?;
    Ok(ApiResponse::success("job type updated successfully", updated).traced(&trace))
}

/// DELETE /job-type/{id}: refused while jobs still reference it.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
) -> ApiResult {
    state.store.delete_job_type(&id).traced(&trace)?;
    Ok(ApiResponse::success("job type deleted successfully", json!({ "id": id })).traced(&trace))
}
