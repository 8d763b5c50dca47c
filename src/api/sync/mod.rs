use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::sync_error;
use crate::api::{AppState, ErrorResponse};
use crate::sync::SyncStats;

/// Synchronize the stop registry now
#[utoipa::path(
    post,
    path = "/api/sync",
    responses(
        (status = 200, description = "Reconciliation statistics per table", body = SyncStats),
        (status = 502, description = "Malformed remote data; store unchanged", body = ErrorResponse),
        (status = 503, description = "Network connection required", body = ErrorResponse),
        (status = 504, description = "Remote registry timed out", body = ErrorResponse)
    ),
    tag = "sync"
)]
pub async fn run_sync(
    State(state): State<AppState>,
) -> Result<Json<SyncStats>, (StatusCode, Json<ErrorResponse>)> {
    state.sync.sync().await.map(Json).map_err(sync_error)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatus {
    /// RFC 3339 timestamp of the last successful sync, if any
    pub last_synced_at: Option<String>,
}

/// When the stop registry was last synchronized
#[utoipa::path(
    get,
    path = "/api/sync/status",
    responses(
        (status = 200, description = "Sync status", body = SyncStatus)
    ),
    tag = "sync"
)]
pub async fn sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(SyncStatus {
        last_synced_at: state.sync.last_synced().await.map(|t| t.to_rfc3339()),
    })
}
