//! The JSON envelope every API response is wrapped in.
//!
//! ```json
//! {"data": {"data": ..., "errors": [], "message": "...", "status": "SUCCESS", "code": 200},
//!  "meta": {"timestamp": "2024-03-01T10:00:00.000Z", "traceid": "..."}}
//! ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;
use txr_scheduler::SchedulerError;
use txr_store::StoreError;

use super::trace::TraceId;

pub struct ApiResponse {
    status: StatusCode,
    message: String,
    data: Value,
    errors: Vec<Value>,
    trace_id: Option<String>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            // Every payload here is plain data; serialization cannot fail.
            data: serde_json::to_value(data).unwrap_or(Value::Null),
            errors: Vec::new(),
            trace_id: None,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>, errors: Vec<Value>) -> Self {
        Self {
            status,
            message: message.into(),
            data: json!([]),
            errors,
            trace_id: None,
        }
    }

    pub fn traced(mut self, trace: &TraceId) -> Self {
        self.trace_id = Some(trace.0.clone());
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status_text = if self.status.is_success() { "SUCCESS" } else { "ERROR" };
        let body = json!({
            "data": {
                "data": self.data,
                "errors": self.errors,
                "message": self.message,
                "status": status_text,
                "code": self.status.as_u16(),
            },
            "meta": {
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "traceid": self.trace_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            },
        });
        (self.status, Json(body)).into_response()
    }
}

/// A failed request, before it is stamped with the caller's trace id.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Vec<Value>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, detail: impl ToString, code: &str) -> Self {
        Self {
            status,
            message: message.into(),
            errors: vec![json!({ "message": detail.to_string(), "code": code })],
        }
    }

    fn internal(detail: impl ToString, code: &str) -> Self {
        let detail = detail.to_string();
        error!(error = %detail, code, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error", detail, code)
    }

    pub fn bad_request(message: impl Into<String>, detail: impl ToString, code: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, detail, code)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, e.to_string(), &e, "NOT_FOUND"),
            StoreError::InUse { .. } => Self::new(StatusCode::CONFLICT, e.to_string(), &e, "IN_USE"),
            StoreError::Database(_) => Self::internal(e, "INTERNAL"),
            StoreError::Core(inner) => Self::internal(inner, inner.code()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::Store(inner) => inner.into(),
            SchedulerError::InvalidSchedule { .. } => {
                Self::bad_request("Invalid request object", &e, e.code())
            }
            SchedulerError::SequenceNotFound { .. }
            | SchedulerError::JobTypeNotFound { .. }
            | SchedulerError::PluginNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, e.to_string(), &e, e.code())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::bad_request("Invalid request object", e.body_text(), "INVALID_BODY")
    }
}

/// Turn any handler error into an enveloped response carrying the trace id.
pub trait TraceResult<T> {
    fn traced(self, trace: &TraceId) -> Result<T, ApiResponse>;
}

impl<T, E: Into<ApiError>> TraceResult<T> for Result<T, E> {
    fn traced(self, trace: &TraceId) -> Result<T, ApiResponse> {
        self.map_err(|e| {
            let e = e.into();
            ApiResponse::error(e.status, e.message, e.errors).traced(trace)
        })
    }
}

pub type ApiResult = Result<ApiResponse, ApiResponse>;
