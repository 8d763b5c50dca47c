use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::{internal_error, AppState, ErrorResponse};
use crate::mutations;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FavoriteResponse {
    pub gtfs_id: String,
    pub is_favorite: bool,
}

/// Set or clear the favorite flag of a stop
#[utoipa::path(
    put,
    path = "/api/stops/{id}/favorite",
    params(("id" = String, Path, description = "GTFS id of the stop")),
    request_body = FavoriteRequest,
    responses(
        (status = 200, description = "New favorite state", body = FavoriteResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn set_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FavoriteRequest>,
) -> Result<Json<FavoriteResponse>, (StatusCode, Json<ErrorResponse>)> {
    mutations::set_favorite(&state.pool, &id, body.is_favorite)
        .await
        .map_err(internal_error)?;

    Ok(Json(FavoriteResponse {
        gtfs_id: id,
        is_favorite: body.is_favorite,
    }))
}
