use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::api::{internal_error, AppState, ErrorResponse};
use crate::models::DepartureFilter;
use crate::{mutations, queries};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FilterList {
    pub filters: Vec<DepartureFilter>,
}

/// List the departure filters of a stop
#[utoipa::path(
    get,
    path = "/api/stops/{id}/filters",
    params(("id" = String, Path, description = "GTFS id of the stop")),
    responses(
        (status = 200, description = "Stored filters; empty means all departures are shown", body = FilterList),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn get_filters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FilterList>, (StatusCode, Json<ErrorResponse>)> {
    let filters = queries::departure_filters(&state.pool, &id)
        .await
        .map_err(internal_error)?;

    Ok(Json(FilterList { filters }))
}

/// Replace the departure filters of a stop
#[utoipa::path(
    put,
    path = "/api/stops/{id}/filters",
    params(("id" = String, Path, description = "GTFS id of the stop")),
    request_body = FilterList,
    responses(
        (status = 200, description = "Filters now in effect", body = FilterList),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn put_filters(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FilterList>,
) -> Result<Json<FilterList>, (StatusCode, Json<ErrorResponse>)> {
    let filters: HashSet<DepartureFilter> = body.filters.into_iter().collect();
    mutations::replace_filters(&state.pool, &id, &filters)
        .await
        .map_err(internal_error)?;

    let filters = queries::departure_filters(&state.pool, &id)
        .await
        .map_err(internal_error)?;

    Ok(Json(FilterList { filters }))
}
