use crate::config::Config;
use crate::models::StopRecord;
use crate::providers::digitransit::{DigitransitClient, FetchError, StopSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};
use utoipa::ToSchema;

const MAX_SYNC_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF_SECS: u64 = 30;

/// Reconciliation counters for one stop table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TableStats {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct SyncStats {
    pub stations: TableStats,
    pub stops: TableStats,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("network connection required")]
    NetworkRequired,
    #[error("request timed out")]
    Timeout,
    #[error("malformed remote data: {0}")]
    MalformedData(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<FetchError> for SyncError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NetworkRequired => SyncError::NetworkRequired,
            FetchError::Timeout => SyncError::Timeout,
            FetchError::Malformed(message) => SyncError::MalformedData(message),
            FetchError::UnknownStop(id) => SyncError::MalformedData(format!("no such stop: {id}")),
        }
    }
}

/// Keeps the local stop registry in step with the remote one.
pub struct SyncManager {
    pool: SqlitePool,
    client: DigitransitClient,
    interval: Duration,
    /// Serializes resyncs; concurrent callers queue behind each other and
    /// the later commit wins.
    sync_lock: Mutex<()>,
    last_synced: RwLock<Option<DateTime<Utc>>>,
}

impl SyncManager {
    pub fn new(pool: SqlitePool, client: DigitransitClient, config: &Config) -> Self {
        Self {
            pool,
            client,
            interval: Duration::from_secs(config.sync_interval_hours * 60 * 60),
            sync_lock: Mutex::new(()),
            last_synced: RwLock::new(None),
        }
    }

    pub async fn last_synced(&self) -> Option<DateTime<Utc>> {
        *self.last_synced.read().await
    }

    /// Background refresh loop: one sync at startup, then one per interval.
    pub async fn start(self: Arc<Self>) {
        info!("Starting sync manager");
        self.sync_with_retries().await;

        let mut interval = tokio::time::interval(self.interval);
        // Skip the first tick which fires immediately (we already synced above)
        interval.tick().await;

        loop {
            interval.tick().await;
            self.sync_with_retries().await;
        }
    }

    async fn sync_with_retries(&self) {
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.sync().await {
                Ok(_) => break,
                Err(e) => {
                    if attempt >= MAX_SYNC_ATTEMPTS {
                        error!(error = %e, attempts = attempt, "Failed to sync stop registry, giving up until next interval");
                        break;
                    }
                    let wait_secs = RETRY_BACKOFF_SECS * u64::from(attempt);
                    error!(error = %e, attempt, wait_secs, "Failed to sync stop registry, retrying...");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
            }
        }
    }

    /// Fetch the current remote snapshot and reconcile both entity classes,
    /// stations first so parent references resolve against fresh rows. The
    /// store keeps its last reconciled state on any failure.
    pub async fn sync(&self) -> Result<SyncStats, SyncError> {
        let _guard = self.sync_lock.lock().await;

        info!("Fetching stop registry snapshot");
        let snapshot = self.client.fetch_stops().await?;
        info!(
            stations = snapshot.stations.len(),
            stops = snapshot.stops.len(),
            "Fetched stop registry snapshot"
        );

        let stats = reconcile_snapshot(&self.pool, &snapshot).await?;
        *self.last_synced.write().await = Some(Utc::now());

        Ok(stats)
    }
}

pub async fn reconcile_snapshot(
    pool: &SqlitePool,
    snapshot: &StopSnapshot,
) -> Result<SyncStats, SyncError> {
    let stations = reconcile_table(pool, "stations", &snapshot.stations).await?;
    let stops = reconcile_table(pool, "stops", &snapshot.stops).await?;

    Ok(SyncStats { stations, stops })
}

/// Make `table` match `records` exactly, in a single transaction: upsert
/// every record (update first since a warm cache mostly updates, insert when
/// absent), remember each id seen, then delete every persistent row the
/// snapshot no longer reports. Favorite and departure-filter rows are never
/// touched. On error the transaction rolls back and the table keeps its
/// previous contents.
pub async fn reconcile_table(
    pool: &SqlitePool,
    table: &str,
    records: &[StopRecord],
) -> Result<TableStats, SyncError> {
    let update_sql = format!(
        "UPDATE {table} SET name = ?, code = ?, lat = ?, lon = ?, vehicle_type = ?, \
         location_type = ?, platform = ?, parent_station = ? WHERE gtfs_id = ?"
    );
    let insert_sql = format!(
        "INSERT INTO {table} (gtfs_id, name, code, lat, lon, vehicle_type, location_type, \
         platform, parent_station) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    let delete_sql =
        format!("DELETE FROM {table} WHERE gtfs_id NOT IN (SELECT gtfs_id FROM seen_ids)");

    let mut stats = TableStats::default();
    let mut tx = pool.begin().await?;

    // Working set of snapshot ids, compared against the persistent table at
    // the end. Temporary tables are connection-scoped and roll back with the
    // rest of the transaction.
    sqlx::query("CREATE TEMPORARY TABLE IF NOT EXISTS seen_ids (gtfs_id TEXT PRIMARY KEY)")
        .execute(&mut *tx)
        .await?;

    for record in records {
        let updated = sqlx::query(&update_sql)
            .bind(&record.name)
            .bind(&record.code)
            .bind(record.lat)
            .bind(record.lon)
            .bind(record.vehicle_type.code())
            .bind(record.location_type.as_str())
            .bind(&record.platform)
            .bind(&record.parent_station)
            .bind(&record.gtfs_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            sqlx::query(&insert_sql)
                .bind(&record.gtfs_id)
                .bind(&record.name)
                .bind(&record.code)
                .bind(record.lat)
                .bind(record.lon)
                .bind(record.vehicle_type.code())
                .bind(record.location_type.as_str())
                .bind(&record.platform)
                .bind(&record.parent_station)
                .execute(&mut *tx)
                .await?;
            stats.added += 1;
        } else {
            stats.updated += updated;
        }

        // OR IGNORE: a duplicate id in the snapshot already sits in the
        // working set; its later occurrence won the update above.
        sqlx::query("INSERT OR IGNORE INTO seen_ids (gtfs_id) VALUES (?)")
            .bind(&record.gtfs_id)
            .execute(&mut *tx)
            .await?;
    }

    stats.deleted = sqlx::query(&delete_sql)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DROP TABLE seen_ids").execute(&mut *tx).await?;

    tx.commit().await?;

    info!(
        table,
        added = stats.added,
        updated = stats.updated,
        deleted = stats.deleted,
        "Reconciled stop table"
    );

    Ok(stats)
}
