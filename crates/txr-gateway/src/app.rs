use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use txr_core::config::TxrConfig;
use txr_scheduler::SchedulerEngine;
use txr_store::SqliteStore;

use crate::http::{applications, health, job_types, sequences, trace};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: TxrConfig,
    pub store: Arc<SqliteStore>,
    pub scheduler: SchedulerEngine,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: TxrConfig, store: Arc<SqliteStore>, scheduler: SchedulerEngine) -> Self {
        Self {
            config,
            store,
            scheduler,
            started_at: Instant::now(),
        }
    }
}

/// Assemble the full Axum router.
///
/// Everything except the health routes requires a `traceid` header.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/application", get(applications::list).post(applications::create))
        .route(
            "/application/{id}",
            put(applications::update).delete(applications::delete),
        )
        .route("/job-type", get(job_types::list).post(job_types::create))
        .route(
            "/job-type/{id}",
            put(job_types::update).delete(job_types::delete),
        )
        .route("/sequence", get(sequences::list).post(sequences::create))
        .route("/sequence/{id}", axum::routing::delete(sequences::delete))
        .route("/sequence/{id}/activate", post(sequences::activate))
        .route("/sequence/{id}/deactivate", post(sequences::deactivate))
        .route("/scheduler", get(sequences::scheduled))
        .route_layer(middleware::from_fn(trace::require_trace_id));

    Router::new()
        .route("/", get(health::health_handler))
        .route("/health", get(health::health_handler))
        .merge(api)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
