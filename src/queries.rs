use crate::models::{DepartureFilter, LocationType, Stop, VehicleType};
use sqlx::{FromRow, SqlitePool};

/// Columns every stop query returns; `is_favorite` comes from the join
/// against the favorites table.
#[derive(Debug, FromRow)]
struct StopRow {
    gtfs_id: String,
    name: String,
    code: String,
    lat: f64,
    lon: f64,
    platform: Option<String>,
    vehicle_type: i64,
    location_type: String,
    parent_station: Option<String>,
    is_favorite: bool,
}

impl From<StopRow> for Stop {
    fn from(row: StopRow) -> Self {
        Stop {
            gtfs_id: row.gtfs_id,
            name: row.name,
            code: row.code,
            lat: row.lat,
            lon: row.lon,
            platform: row.platform,
            vehicle_type: VehicleType::from_code(row.vehicle_type),
            location_type: LocationType::from_db(&row.location_type),
            parent_station: row.parent_station,
            is_favorite: row.is_favorite,
        }
    }
}

const FAVORITES_SQL: &str = "\
    SELECT * FROM (\
        SELECT s.gtfs_id, s.name, s.code, s.lat, s.lon, s.platform, s.vehicle_type, \
               s.location_type, s.parent_station, 1 AS is_favorite \
        FROM stops s \
        INNER JOIN favorites f ON f.gtfs_id = s.gtfs_id \
        UNION \
        SELECT st.gtfs_id, st.name, st.code, st.lat, st.lon, st.platform, st.vehicle_type, \
               st.location_type, st.parent_station, 1 AS is_favorite \
        FROM stations st \
        INNER JOIN favorites f ON f.gtfs_id = st.gtfs_id \
    ) \
    WHERE location_type != ? \
    ORDER BY vehicle_type, name";

const NEARBY_SQL: &str = "\
    SELECT * FROM (\
        SELECT s.gtfs_id, s.name, s.code, s.lat, s.lon, s.platform, s.vehicle_type, \
               s.location_type, s.parent_station, f.gtfs_id IS NOT NULL AS is_favorite, \
               (? - s.lat) * (? - s.lat) + (? - s.lon) * (? - s.lon) AS distance_estimate \
        FROM stops s \
        LEFT JOIN favorites f ON f.gtfs_id = s.gtfs_id \
        UNION \
        SELECT st.gtfs_id, st.name, st.code, st.lat, st.lon, st.platform, st.vehicle_type, \
               st.location_type, st.parent_station, f.gtfs_id IS NOT NULL AS is_favorite, \
               (? - st.lat) * (? - st.lat) + (? - st.lon) * (? - st.lon) AS distance_estimate \
        FROM stations st \
        LEFT JOIN favorites f ON f.gtfs_id = st.gtfs_id \
    ) \
    ORDER BY distance_estimate \
    LIMIT ?";

const SEARCH_SQL: &str = "\
    SELECT * FROM (\
        SELECT s.gtfs_id, s.name, s.code, s.lat, s.lon, s.platform, s.vehicle_type, \
               s.location_type, s.parent_station, f.gtfs_id IS NOT NULL AS is_favorite \
        FROM stops s \
        LEFT JOIN favorites f ON f.gtfs_id = s.gtfs_id \
        WHERE s.name LIKE ? \
          AND (s.parent_station IS NULL OR NOT EXISTS (\
              SELECT 1 FROM stations p \
              WHERE p.gtfs_id = s.parent_station AND p.name LIKE ?)) \
        UNION \
        SELECT st.gtfs_id, st.name, st.code, st.lat, st.lon, st.platform, st.vehicle_type, \
               st.location_type, st.parent_station, f.gtfs_id IS NOT NULL AS is_favorite \
        FROM stations st \
        LEFT JOIN favorites f ON f.gtfs_id = st.gtfs_id \
        WHERE st.name LIKE ? \
    ) \
    WHERE location_type != ? \
    ORDER BY name \
    LIMIT ?";

/// Bind value for the citybike exclusion: no row carries an empty location
/// type, so matching against the empty string disables the filter.
fn citybike_exclusion(include_citybikes: bool) -> &'static str {
    if include_citybikes {
        ""
    } else {
        LocationType::CitybikeStation.as_str()
    }
}

/// All favorited stop-like rows, ordered by vehicle type then name. The
/// favorites set is assumed small; no limit applies. Favorites whose stop
/// has vanished from the registry are silently omitted.
pub async fn favorites(
    pool: &SqlitePool,
    include_citybikes: bool,
) -> Result<Vec<Stop>, sqlx::Error> {
    let rows: Vec<StopRow> = sqlx::query_as(FAVORITES_SQL)
        .bind(citybike_exclusion(include_citybikes))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Stop::from).collect())
}

/// Up to `limit` rows ordered by ascending squared distance in degree space.
/// The estimate keeps nearest-first ordering at city scale while staying
/// cheap to compute; it misorders near the poles and across large longitude
/// spans. The favorite flag is annotation here, not a filter.
pub async fn nearby(
    pool: &SqlitePool,
    lat: f64,
    lon: f64,
    limit: u32,
) -> Result<Vec<Stop>, sqlx::Error> {
    assert!(limit > 0, "result limit must be positive");

    let rows: Vec<StopRow> = sqlx::query_as(NEARBY_SQL)
        .bind(lat)
        .bind(lat)
        .bind(lon)
        .bind(lon)
        .bind(lat)
        .bind(lat)
        .bind(lon)
        .bind(lon)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Stop::from).collect())
}

/// Substring match against names, both ends wildcarded; the empty pattern
/// matches everything. A child stop is hidden when its parent station is
/// itself a match (the station row already covers its platforms), but still
/// returned when only its own name matches.
pub async fn search(
    pool: &SqlitePool,
    pattern: &str,
    limit: u32,
    include_citybikes: bool,
) -> Result<Vec<Stop>, sqlx::Error> {
    assert!(limit > 0, "result limit must be positive");

    let like = format!("%{pattern}%");
    let rows: Vec<StopRow> = sqlx::query_as(SEARCH_SQL)
        .bind(&like)
        .bind(&like)
        .bind(&like)
        .bind(citybike_exclusion(include_citybikes))
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Stop::from).collect())
}

/// The stored departure filter set for one stop. Empty means "show all".
pub async fn departure_filters(
    pool: &SqlitePool,
    gtfs_id: &str,
) -> Result<Vec<DepartureFilter>, sqlx::Error> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT route, headsign FROM departure_filters WHERE gtfs_id = ?")
            .bind(gtfs_id)
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(route, headsign)| DepartureFilter { route, headsign })
        .collect())
}
