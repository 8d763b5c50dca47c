use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::error::fetch_error;
use crate::api::stops::list::resolve_limit;
use crate::api::{internal_error, AppState, ErrorResponse};
use crate::models::Departure;
use crate::queries;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeparturesQuery {
    /// Maximum number of departures; defaults to the configured limit
    pub limit: Option<i64>,
}

/// Upcoming departures from a stop, honoring its stored filters
#[utoipa::path(
    get,
    path = "/api/stops/{id}/departures",
    params(("id" = String, Path, description = "GTFS id of the stop"), DeparturesQuery),
    responses(
        (status = 200, description = "Next departures; filtered when the stop has filters", body = [Departure]),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 404, description = "Unknown stop", body = ErrorResponse),
        (status = 502, description = "Malformed upstream response", body = ErrorResponse),
        (status = 503, description = "Network connection required", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn list_departures(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeparturesQuery>,
) -> Result<Json<Vec<Departure>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = resolve_limit(query.limit, state.default_limit)?;

    let filters = queries::departure_filters(&state.pool, &id)
        .await
        .map_err(internal_error)?;

    let departures = state
        .client
        .departures(&id, limit)
        .await
        .map_err(fetch_error)?;

    let departures = if filters.is_empty() {
        departures
    } else {
        departures
            .into_iter()
            .filter(|d| filters.iter().any(|f| f.matches(d)))
            .collect()
    };

    Ok(Json(departures))
}
