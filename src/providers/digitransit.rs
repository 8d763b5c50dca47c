use crate::models::{Departure, LocationType, StopRecord, VehicleType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Bounded wait for a single remote call; anything slower is a timeout
/// failure the caller may retry.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(60);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One query fetches the full registry: plain stops, stations grouping them,
/// and citybike rental stations.
const STOPS_QUERY: &str = "query { \
    stops { gtfsId name code lat lon platformCode vehicleType parentStation { gtfsId } } \
    stations { gtfsId name code lat lon vehicleType } \
    bikeRentalStations { stationId name lat lon } \
}";

/// The full current state of the remote stop registry.
#[derive(Debug, Clone)]
pub struct StopSnapshot {
    pub stations: Vec<StopRecord>,
    pub stops: Vec<StopRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network connection required")]
    NetworkRequired,
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no such stop: {0}")]
    UnknownStop(String),
}

impl FetchError {
    fn from_request(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::NetworkRequired
        }
    }
}

/// Client for the journey planner GraphQL API.
#[derive(Debug, Clone)]
pub struct DigitransitClient {
    client: reqwest::Client,
    url: String,
}

impl DigitransitClient {
    pub fn new(url: String) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(WAIT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Malformed(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    /// Fetch the full stop registry. Any record missing a mandatory field
    /// fails the whole fetch; a partial snapshot would silently delete stops
    /// during reconciliation.
    pub async fn fetch_stops(&self) -> Result<StopSnapshot, FetchError> {
        let data: StopListData = self.query(STOPS_QUERY).await?;
        Ok(build_snapshot(data))
    }

    /// Fetch the next departures for a single stop.
    pub async fn departures(
        &self,
        stop_id: &str,
        count: u32,
    ) -> Result<Vec<Departure>, FetchError> {
        let query = format!(
            "query {{ stop(id: \"{stop_id}\") {{ \
                stoptimesWithoutPatterns(numberOfDepartures: {count}) {{ \
                    realtime serviceDay scheduledDeparture realtimeDeparture \
                    stop {{ platformCode }} \
                    trip {{ route {{ shortName type }} tripHeadsign }} \
                }} \
            }} }}"
        );

        let data: DeparturesData = self.query(&query).await?;
        let stop = data
            .stop
            .ok_or_else(|| FetchError::UnknownStop(stop_id.to_string()))?;

        Ok(stop
            .stoptimes_without_patterns
            .into_iter()
            .map(ApiStopTime::into_departure)
            .collect())
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, query: &str) -> Result<T, FetchError> {
        let body = serde_json::json!({ "query": query });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Malformed(format!("unexpected status {status}")));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if let Some(errors) = envelope.errors {
            return Err(FetchError::Malformed(format!("GraphQL errors: {errors}")));
        }

        envelope
            .data
            .ok_or_else(|| FetchError::Malformed("response contains no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopListData {
    stops: Vec<ApiStop>,
    stations: Vec<ApiStop>,
    #[serde(default)]
    bike_rental_stations: Vec<ApiBikeStation>,
}

/// A stop-like record as returned by the registry query. Identity, name,
/// coordinates and vehicle type are mandatory; their absence is a parse
/// failure for the whole response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStop {
    gtfs_id: String,
    name: String,
    #[serde(default)]
    code: Option<String>,
    lat: f64,
    lon: f64,
    vehicle_type: i64,
    #[serde(default)]
    platform_code: Option<String>,
    #[serde(default)]
    parent_station: Option<ParentStation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentStation {
    gtfs_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiBikeStation {
    station_id: String,
    name: String,
    lat: f64,
    lon: f64,
}

impl ApiStop {
    fn into_record(self, location_type: LocationType) -> StopRecord {
        StopRecord {
            gtfs_id: self.gtfs_id,
            name: self.name,
            code: self.code.unwrap_or_default(),
            lat: self.lat,
            lon: self.lon,
            vehicle_type: VehicleType::from_code(self.vehicle_type),
            location_type,
            platform: normalize_platform(self.platform_code),
            parent_station: self.parent_station.map(|p| p.gtfs_id),
        }
    }
}

impl ApiBikeStation {
    /// Citybike stations have no GTFS metadata; the station id doubles as the
    /// human-readable code.
    fn into_record(self) -> StopRecord {
        StopRecord {
            gtfs_id: self.station_id.clone(),
            name: self.name,
            code: self.station_id,
            lat: self.lat,
            lon: self.lon,
            vehicle_type: VehicleType::Citybike,
            location_type: LocationType::CitybikeStation,
            platform: None,
            parent_station: None,
        }
    }
}

fn build_snapshot(data: StopListData) -> StopSnapshot {
    let stops = data
        .stops
        .into_iter()
        .map(|s| s.into_record(LocationType::Stop))
        .collect();

    let mut stations: Vec<StopRecord> = data
        .stations
        .into_iter()
        .map(|s| s.into_record(LocationType::Station))
        .collect();
    stations.extend(data.bike_rental_stations.into_iter().map(ApiBikeStation::into_record));

    StopSnapshot { stations, stops }
}

/// The API reports missing platforms as an empty string or the literal
/// string "null".
fn normalize_platform(value: Option<String>) -> Option<String> {
    value.filter(|p| !p.is_empty() && p != "null")
}

#[derive(Debug, Deserialize)]
struct DeparturesData {
    stop: Option<ApiStopTimes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStopTimes {
    stoptimes_without_patterns: Vec<ApiStopTime>,
}

/// Departure times come as seconds since midnight of `service_day`, itself
/// an epoch timestamp.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStopTime {
    realtime: bool,
    service_day: i64,
    scheduled_departure: i64,
    realtime_departure: i64,
    #[serde(default)]
    stop: Option<ApiPlatform>,
    trip: ApiTrip,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlatform {
    #[serde(default)]
    platform_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTrip {
    route: ApiRoute,
    #[serde(default)]
    trip_headsign: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(rename = "type")]
    route_type: i64,
}

impl ApiStopTime {
    fn into_departure(self) -> Departure {
        let vehicle_type = VehicleType::from_route_type(self.trip.route.route_type);

        Departure {
            route: normalize_route(self.trip.route.short_name, vehicle_type),
            vehicle_type,
            headsign: self.trip.trip_headsign.unwrap_or_default(),
            platform: self.stop.and_then(|s| normalize_platform(s.platform_code)),
            scheduled_departure: epoch(self.service_day + self.scheduled_departure),
            realtime_departure: epoch(self.service_day + self.realtime_departure),
            realtime: self.realtime,
        }
    }
}

fn epoch(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

/// Some modes report no route code (e.g. the subway); substitute the
/// conventional letter instead of an empty badge.
fn normalize_route(route: Option<String>, vehicle_type: VehicleType) -> String {
    match route.filter(|r| !r.is_empty() && r != "null") {
        Some(route) => route,
        None if vehicle_type == VehicleType::Subway => "M".to_string(),
        None => "?".to_string(),
    }
}
