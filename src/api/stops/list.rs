use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::error::bad_request;
use crate::api::{internal_error, AppState, ErrorResponse};
use crate::models::Stop;
use crate::queries;

#[derive(Debug, Deserialize, IntoParams)]
pub struct FavoritesQuery {
    /// Include citybike stations in the result
    #[serde(default)]
    pub citybikes: bool,
}

/// List favorited stops and stations
#[utoipa::path(
    get,
    path = "/api/stops/favorites",
    params(FavoritesQuery),
    responses(
        (status = 200, description = "Favorited stops ordered by vehicle type and name", body = [Stop]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn favorite_stops(
    State(state): State<AppState>,
    Query(query): Query<FavoritesQuery>,
) -> Result<Json<Vec<Stop>>, (StatusCode, Json<ErrorResponse>)> {
    let stops = queries::favorites(&state.pool, query.citybikes)
        .await
        .map_err(internal_error)?;

    Ok(Json(stops))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NearbyQuery {
    /// Latitude of the reference point in degrees
    pub lat: f64,
    /// Longitude of the reference point in degrees
    pub lon: f64,
    /// Maximum number of rows; defaults to the configured limit
    pub limit: Option<i64>,
}

/// List the stops nearest to a location
#[utoipa::path(
    get,
    path = "/api/stops/nearby",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Stops ordered by distance to the reference point", body = [Stop]),
        (status = 400, description = "Invalid limit or coordinates", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn nearby_stops(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<Stop>>, (StatusCode, Json<ErrorResponse>)> {
    if !query.lat.is_finite() || !query.lon.is_finite() {
        return Err(bad_request("lat and lon must be finite numbers"));
    }
    let limit = resolve_limit(query.limit, state.default_limit)?;

    let stops = queries::nearby(&state.pool, query.lat, query.lon, limit)
        .await
        .map_err(internal_error)?;

    Ok(Json(stops))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Substring to match against stop names; empty matches everything
    #[serde(default)]
    pub q: String,
    /// Maximum number of rows; defaults to the configured limit
    pub limit: Option<i64>,
    /// Include citybike stations in the result
    #[serde(default)]
    pub citybikes: bool,
}

/// Search stops and stations by name
#[utoipa::path(
    get,
    path = "/api/stops/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching stops ordered by name", body = [Stop]),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn search_stops(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Stop>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = resolve_limit(query.limit, state.default_limit)?;

    let stops = queries::search(&state.pool, &query.q, limit, query.citybikes)
        .await
        .map_err(internal_error)?;

    Ok(Json(stops))
}

/// A missing limit falls back to the configured default; zero or negative is
/// a caller error and is rejected, never silently clamped.
pub(crate) fn resolve_limit(
    requested: Option<i64>,
    default: u32,
) -> Result<u32, (StatusCode, Json<ErrorResponse>)> {
    match requested {
        None => Ok(default),
        Some(value) if value > 0 => Ok(value as u32),
        Some(value) => Err(bad_request(format!("limit must be positive, got {value}"))),
    }
}
