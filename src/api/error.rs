use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::providers::digitransit::FetchError;
use crate::sync::SyncError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Helper to log error and return generic internal server error
pub fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, Json<ErrorResponse>) {
    error!("Internal error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
}

/// A caller contract violation (bad limit, bad coordinates); never retried.
pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map sync failures so callers can tell a retryable connectivity problem
/// from a broken upstream payload. The store keeps its last reconciled state
/// in every case.
pub fn sync_error(err: SyncError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        SyncError::NetworkRequired => StatusCode::SERVICE_UNAVAILABLE,
        SyncError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SyncError::MalformedData(_) => StatusCode::BAD_GATEWAY,
        SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(error = %err, "Sync request failed");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

pub fn fetch_error(err: FetchError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        FetchError::NetworkRequired => StatusCode::SERVICE_UNAVAILABLE,
        FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FetchError::Malformed(_) => StatusCode::BAD_GATEWAY,
        FetchError::UnknownStop(_) => StatusCode::NOT_FOUND,
    };
    error!(error = %err, "Departure fetch failed");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
