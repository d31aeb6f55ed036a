use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use txr_scheduler::{CronSchedule, SchedulerError};
use txr_store::NewSequence;

use super::envelope::{ApiResponse, ApiResult, TraceResult};
use super::trace::TraceId;
use crate::app::AppState;

/// GET /sequence: every sequence with its jobs.
pub async fn list(State(state): State<Arc<AppState>>, Extension(trace): Extension<TraceId>) -> ApiResult {
    let sequences = state.store.list_sequences().traced(&trace)?;
    Ok(ApiResponse::success("sequence fetched successfully", sequences).traced(&trace))
}

/// POST /sequence: creates an INACTIVE sequence; `~placeholders` in the
/// jobs are replaced with generated ids.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    body: Result<Json<NewSequence>, JsonRejection>,
) -> ApiResult {
    let Json(new) = body.traced(&trace)?;
    // Reject a bad frequency now rather than at activation.
    CronSchedule::parse(&new.frequency)
        .and_then(|schedule| schedule.first_after(Utc::now()))
        .traced(&trace)?;
    let sequence = state
        .store
        .create_sequence(new, Some(&trace.0))
        .traced(&trace)?;
    Ok(ApiResponse::success("sequence created successfully", sequence).traced(&trace))
}

/// DELETE /sequence/{id}: stops the timer, then deletes the sequence and
/// its jobs.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
) -> ApiResult {
    match state.scheduler.deactivate(&id) {
        Ok(_) | Err(SchedulerError::SequenceNotFound { .. }) => {}
        Err(e) => return Err(e).traced(&trace),
    }
    state.store.delete_sequence(&id).traced(&trace)?;
    Ok(ApiResponse::success("sequence deleted successfully", json!({ "id": id })).traced(&trace))
}

/// POST /sequence/{id}/activate
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
) -> ApiResult {
    let summary = state.scheduler.activate(&id, Some(&trace.0)).traced(&trace)?;

    let skipped: Vec<_> = summary
        .failures
        .iter()
        .map(|f| json!({ "job_id": f.job_id, "code": f.error.code(), "message": f.error.to_string() }))
        .collect();
    if !skipped.is_empty() {
        info!(sequence_id = %id, skipped = skipped.len(), "sequence activated with skipped jobs");
    }

    Ok(ApiResponse::success(
        "sequence activated successfully",
        json!({
            "sequence_id": summary.sequence_id,
            "runners": summary.runners,
            "skipped": skipped,
            "replaced": summary.replaced,
            "next_run": summary.next_run,
        }),
    )
    .traced(&trace))
}

/// POST /sequence/{id}/deactivate
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Extension(trace): Extension<TraceId>,
    Path(id): Path<String>,
) -> ApiResult {
    let was_running = state.scheduler.deactivate(&id).traced(&trace)?;
    Ok(ApiResponse::success(
        "sequence deactivated successfully",
        json!({ "sequence_id": id, "was_running": was_running }),
    )
    .traced(&trace))
}

/// GET /scheduler: the live timers.
pub async fn scheduled(State(state): State<Arc<AppState>>, Extension(trace): Extension<TraceId>) -> ApiResponse {
    ApiResponse::success("scheduler fetched successfully", state.scheduler.scheduled()).traced(&trace)
}
