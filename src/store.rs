use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Current schema version. `migrate` walks `PRAGMA user_version` up to this
/// one step at a time.
pub const SCHEMA_VERSION: i64 = 4;

/// First revision of the stop table, kept for the migration ladder.
const CREATE_STOPS_V1: &str = "\
    CREATE TABLE stops (\
        gtfs_id TEXT PRIMARY KEY NOT NULL,\
        name TEXT NOT NULL,\
        code TEXT NOT NULL DEFAULT '',\
        lat REAL NOT NULL,\
        lon REAL NOT NULL,\
        vehicle_type INTEGER NOT NULL,\
        platform TEXT\
    )";

const CREATE_STOPS: &str = "\
    CREATE TABLE stops (\
        gtfs_id TEXT PRIMARY KEY NOT NULL,\
        name TEXT NOT NULL,\
        code TEXT NOT NULL DEFAULT '',\
        lat REAL NOT NULL,\
        lon REAL NOT NULL,\
        vehicle_type INTEGER NOT NULL,\
        location_type TEXT NOT NULL DEFAULT 'STOP',\
        platform TEXT,\
        parent_station TEXT\
    )";

const CREATE_STATIONS: &str = "\
    CREATE TABLE stations (\
        gtfs_id TEXT PRIMARY KEY NOT NULL,\
        name TEXT NOT NULL,\
        code TEXT NOT NULL DEFAULT '',\
        lat REAL NOT NULL,\
        lon REAL NOT NULL,\
        vehicle_type INTEGER NOT NULL,\
        location_type TEXT NOT NULL DEFAULT 'STATION',\
        platform TEXT,\
        parent_station TEXT\
    )";

/// Presence of a row means the stop is favorited. The reference to the stop
/// tables is advisory: a favorite may momentarily point at an id that a resync
/// has not (re)inserted yet.
const CREATE_FAVORITES: &str = "\
    CREATE TABLE favorites (\
        gtfs_id TEXT PRIMARY KEY NOT NULL\
    )";

/// Deliberately unkeyed: a stop may have zero or many filter rows.
const CREATE_DEPARTURE_FILTERS: &str = "\
    CREATE TABLE departure_filters (\
        gtfs_id TEXT NOT NULL,\
        route TEXT NOT NULL,\
        headsign TEXT NOT NULL\
    )";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("schema migration to v{version} failed: {source}")]
    MigrationFailed { version: i64, source: sqlx::Error },
    #[error("database schema v{0} is newer than this binary supports")]
    VersionTooNew(i64),
}

/// Open (creating if missing) the stop database at `path` and bring its
/// schema up to `SCHEMA_VERSION`.
pub async fn open(path: &str) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    migrate(&pool).await?;

    Ok(pool)
}

/// Walk the migration ladder from the persisted `user_version` to
/// `SCHEMA_VERSION`. Steps are linear and irreversible; a failing step leaves
/// the schema in an undefined state, so the error is fatal at startup.
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if current > SCHEMA_VERSION {
        return Err(StoreError::VersionTooNew(current));
    }

    for version in (current + 1)..=SCHEMA_VERSION {
        apply_step(pool, version)
            .await
            .map_err(|source| StoreError::MigrationFailed { version, source })?;

        sqlx::query(&format!("PRAGMA user_version = {version}"))
            .execute(pool)
            .await?;

        info!(version, "Applied schema migration");
    }

    Ok(())
}

async fn apply_step(pool: &SqlitePool, version: i64) -> Result<(), sqlx::Error> {
    match version {
        1 => {
            sqlx::query(CREATE_STOPS_V1).execute(pool).await?;
        }
        2 => {
            // The stop table gained location_type and parent_station; the old
            // contents are rebuilt from the remote on the next sync anyway.
            sqlx::query("DROP TABLE IF EXISTS stops").execute(pool).await?;
            sqlx::query(CREATE_STOPS).execute(pool).await?;
            sqlx::query(CREATE_STATIONS).execute(pool).await?;
        }
        3 => {
            sqlx::query(CREATE_FAVORITES).execute(pool).await?;
        }
        4 => {
            sqlx::query(CREATE_DEPARTURE_FILTERS).execute(pool).await?;
        }
        _ => unreachable!("no migration step for version {version}"),
    }

    Ok(())
}

/// In-memory database for tests. A single connection keeps temporary tables
/// and the data on the same handle.
#[cfg(test)]
pub(crate) async fn memory_store() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    migrate(&pool).await.expect("migrations");
    pool
}
