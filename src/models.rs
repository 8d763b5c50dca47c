use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

/// Vehicle classification for a stop or a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Tram,
    Subway,
    Bus,
    CommuterTrain,
    Citybike,
}

impl VehicleType {
    /// Numeric code persisted in the stop tables. Matches the codes the remote
    /// registry uses for stops; citybike stations have no remote route type and
    /// use a local sentinel.
    pub fn code(self) -> i64 {
        match self {
            VehicleType::Tram => 0,
            VehicleType::Subway => 1,
            VehicleType::Bus => 3,
            VehicleType::CommuterTrain => 109,
            VehicleType::Citybike => -1,
        }
    }

    /// Convert a stop-level vehicle type code. Known codes: 0 tram, 1 subway,
    /// 3 bus, 109 commuter train. Unknown codes downgrade to bus.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => VehicleType::Tram,
            1 => VehicleType::Subway,
            3 => VehicleType::Bus,
            109 => VehicleType::CommuterTrain,
            -1 => VehicleType::Citybike,
            _ => {
                warn!(code, "Unknown vehicle type code, defaulting to bus");
                VehicleType::Bus
            }
        }
    }

    /// Convert an extended GTFS route type as used by departure rows:
    /// 0 tram, 1 subway, 100-199 some kind of train, 700-799 bus service.
    /// Values not seen in the wild default to bus.
    pub fn from_route_type(value: i64) -> Self {
        match value {
            0 => VehicleType::Tram,
            1 => VehicleType::Subway,
            100..=199 => VehicleType::CommuterTrain,
            700..=799 => VehicleType::Bus,
            _ => {
                warn!(value, "Unknown route type, defaulting to bus");
                VehicleType::Bus
            }
        }
    }
}

/// Whether a row is a plain stop, a station grouping stops, or a citybike
/// rental station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    Stop,
    Station,
    CitybikeStation,
}

impl LocationType {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::Stop => "STOP",
            LocationType::Station => "STATION",
            LocationType::CitybikeStation => "CITYBIKE_STATION",
        }
    }

    /// Parse the persisted value. Unknown values downgrade to a plain stop.
    pub fn from_db(value: &str) -> Self {
        match value {
            "STOP" => LocationType::Stop,
            "STATION" => LocationType::Station,
            "CITYBIKE_STATION" => LocationType::CitybikeStation,
            other => {
                warn!(location_type = other, "Unknown location type, defaulting to stop");
                LocationType::Stop
            }
        }
    }
}

/// A stop-like record as reported by the remote registry. Stations and
/// citybike stations share this shape; `gtfs_id` is the stable join key for
/// reconciliation.
#[derive(Debug, Clone)]
pub struct StopRecord {
    pub gtfs_id: String,
    pub name: String,
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    pub vehicle_type: VehicleType,
    pub location_type: LocationType,
    pub platform: Option<String>,
    pub parent_station: Option<String>,
}

/// A stop-like row as served by the query engine, annotated with the user's
/// favorite flag.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Stop {
    pub gtfs_id: String,
    pub name: String,
    pub code: String,
    pub lat: f64,
    pub lon: f64,
    pub platform: Option<String>,
    pub vehicle_type: VehicleType,
    pub location_type: LocationType,
    pub parent_station: Option<String>,
    pub is_favorite: bool,
}

/// A user-defined departure display filter: only departures whose route and
/// headsign match one of the stop's filters are shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct DepartureFilter {
    pub route: String,
    pub headsign: String,
}

impl DepartureFilter {
    pub fn matches(&self, departure: &Departure) -> bool {
        departure.route == self.route && departure.headsign == self.headsign
    }
}

/// A single departure from a stop.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Departure {
    pub route: String,
    pub vehicle_type: VehicleType,
    pub headsign: String,
    pub platform: Option<String>,
    pub scheduled_departure: DateTime<Utc>,
    /// Same as `scheduled_departure` when no realtime prediction is available.
    pub realtime_departure: DateTime<Utc>,
    pub realtime: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_type_known_codes_round_trip() {
        for vehicle_type in [
            VehicleType::Tram,
            VehicleType::Subway,
            VehicleType::Bus,
            VehicleType::CommuterTrain,
            VehicleType::Citybike,
        ] {
            assert_eq!(VehicleType::from_code(vehicle_type.code()), vehicle_type);
        }
    }

    #[test]
    fn unknown_vehicle_type_code_downgrades_to_bus() {
        assert_eq!(VehicleType::from_code(42), VehicleType::Bus);
    }

    #[test]
    fn route_type_ranges() {
        assert_eq!(VehicleType::from_route_type(0), VehicleType::Tram);
        assert_eq!(VehicleType::from_route_type(1), VehicleType::Subway);
        assert_eq!(VehicleType::from_route_type(109), VehicleType::CommuterTrain);
        assert_eq!(VehicleType::from_route_type(704), VehicleType::Bus);
        assert_eq!(VehicleType::from_route_type(900), VehicleType::Bus);
    }

    #[test]
    fn unknown_location_type_downgrades_to_stop() {
        assert_eq!(LocationType::from_db("ENTRANCE"), LocationType::Stop);
        assert_eq!(
            LocationType::from_db("CITYBIKE_STATION"),
            LocationType::CitybikeStation
        );
    }
}
