use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use tracing::{debug, Instrument};
use uuid::Uuid;

use super::envelope::ApiResponse;

pub const TRACE_HEADER: &str = "traceid";

/// The caller's `traceid` header, validated and stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

/// Reject requests without a UUID v4 `traceid` header.
pub async fn require_trace_id(mut req: Request, next: Next) -> Response {
    let raw = req
        .headers()
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let errors = header_errors(req.headers(), raw.as_deref());
    if !errors.is_empty() {
        debug!(uri = %req.uri(), "rejected request header");
        return ApiResponse::error(StatusCode::BAD_REQUEST, "Invalid request header", errors)
            .with_trace_id(raw)
            .into_response();
    }

    let trace_id = raw.unwrap_or_default();
    let span = tracing::info_span!("request", traceid = %trace_id);
    req.extensions_mut().insert(TraceId(trace_id));
    next.run(req).instrument(span).await
}

fn header_errors(headers: &HeaderMap, value: Option<&str>) -> Vec<Value> {
    if !headers.contains_key(TRACE_HEADER) {
        return vec![json!({ "message": format!("Missing header: {TRACE_HEADER}") })];
    }
    match value {
        Some(v) if is_uuid_v4(v) => Vec::new(),
        _ => vec![json!({ "message": format!("Invalid uuid: {TRACE_HEADER}") })],
    }
}

pub fn is_uuid_v4(value: &str) -> bool {
    // Only the hyphenated form is accepted.
    value.len() == 36
        && Uuid::parse_str(value)
            .map(|u| u.get_version_num() == 4 && u.get_variant() == uuid::Variant::RFC4122)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_hyphenated_v4() {
        assert!(is_uuid_v4("3f0b6c1e-8a4d-4c2b-9f1a-2b7d5e6c9a10"));
        assert!(is_uuid_v4(&Uuid::new_v4().to_string()));
        assert!(is_uuid_v4("3F0B6C1E-8A4D-4C2B-9F1A-2B7D5E6C9A10"));
        // v7
        assert!(!is_uuid_v4(&Uuid::now_v7().to_string()));
        assert!(!is_uuid_v4("3f0b6c1e8a4d4c2b9f1a2b7d5e6c9a10"));
        assert!(!is_uuid_v4("3f0b6c1e-8a4d-4c2b-7f1a-2b7d5e6c9a10"));
        assert!(!is_uuid_v4("not-a-uuid"));
    }
}
