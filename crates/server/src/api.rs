pub mod jobs;

use axum::http::StatusCode;
use axum::Json;
use graphsplit_store::StoreError;
use serde_json::{json, Value};

pub type ApiError = (StatusCode, Json<Value>);

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

pub(crate) fn bad_request(msg: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": msg.to_string() })))
}

/// Map a StoreError to an HTTP response.
pub(crate) fn store_err(e: StoreError) -> ApiError {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %e, "store error");
    }
    (status, Json(json!({ "error": e.to_string() })))
}
