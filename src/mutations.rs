use crate::models::DepartureFilter;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::debug;

/// Set or clear the favorite flag for a stop-like id. Clearing an id that is
/// not favorited is a no-op reported as success.
pub async fn set_favorite(
    pool: &SqlitePool,
    gtfs_id: &str,
    is_favorite: bool,
) -> Result<(), sqlx::Error> {
    if is_favorite {
        sqlx::query("INSERT OR IGNORE INTO favorites (gtfs_id) VALUES (?)")
            .bind(gtfs_id)
            .execute(pool)
            .await?;
    } else {
        let deleted = sqlx::query("DELETE FROM favorites WHERE gtfs_id = ?")
            .bind(gtfs_id)
            .execute(pool)
            .await?
            .rows_affected();
        debug!(gtfs_id, deleted, "Cleared favorite");
    }

    Ok(())
}

/// Replace the departure filter set of a stop in one transaction: delete
/// everything for the id, insert the given set. The empty set is legal and
/// clears filtering for the stop.
pub async fn replace_filters(
    pool: &SqlitePool,
    gtfs_id: &str,
    filters: &HashSet<DepartureFilter>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM departure_filters WHERE gtfs_id = ?")
        .bind(gtfs_id)
        .execute(&mut *tx)
        .await?;

    for filter in filters {
        sqlx::query("INSERT INTO departure_filters (gtfs_id, route, headsign) VALUES (?, ?, ?)")
            .bind(gtfs_id)
            .bind(&filter.route)
            .bind(&filter.headsign)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries;
    use crate::store::memory_store;

    fn filter(route: &str, headsign: &str) -> DepartureFilter {
        DepartureFilter {
            route: route.to_string(),
            headsign: headsign.to_string(),
        }
    }

    #[tokio::test]
    async fn favorite_toggles_on_and_off() {
        let pool = memory_store().await;

        set_favorite(&pool, "A", true).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Setting twice stays a single membership row.
        set_favorite(&pool, "A", true).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        set_favorite(&pool, "A", false).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn clearing_an_absent_favorite_succeeds() {
        let pool = memory_store().await;
        set_favorite(&pool, "NOT_THERE", false).await.unwrap();
    }

    #[tokio::test]
    async fn replace_filters_is_all_or_nothing() {
        let pool = memory_store().await;

        let first = HashSet::from([filter("550", "Westendinasema"), filter("551", "Pasila")]);
        replace_filters(&pool, "S", &first).await.unwrap();
        assert_eq!(queries::departure_filters(&pool, "S").await.unwrap().len(), 2);

        let second = HashSet::from([filter("194", "Friisilä")]);
        replace_filters(&pool, "S", &second).await.unwrap();

        let stored = queries::departure_filters(&pool, "S").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].route, "194");
    }

    #[tokio::test]
    async fn empty_filter_set_clears_filtering() {
        let pool = memory_store().await;
        replace_filters(&pool, "S", &HashSet::from([filter("550", "X")]))
            .await
            .unwrap();

        replace_filters(&pool, "S", &HashSet::new()).await.unwrap();
        assert!(queries::departure_filters(&pool, "S").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filters_are_scoped_to_their_stop() {
        let pool = memory_store().await;
        replace_filters(&pool, "S1", &HashSet::from([filter("550", "X")]))
            .await
            .unwrap();
        replace_filters(&pool, "S2", &HashSet::from([filter("551", "Y")]))
            .await
            .unwrap();

        replace_filters(&pool, "S1", &HashSet::new()).await.unwrap();

        assert!(queries::departure_filters(&pool, "S1").await.unwrap().is_empty());
        assert_eq!(queries::departure_filters(&pool, "S2").await.unwrap().len(), 1);
    }
}
