pub mod error;
pub mod stops;
pub mod sync;

pub use error::{internal_error, ErrorResponse};

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use crate::providers::digitransit::DigitransitClient;
use crate::sync::SyncManager;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub client: DigitransitClient,
    pub sync: Arc<SyncManager>,
    /// Fallback result limit for requests that do not carry their own.
    pub default_limit: u32,
}

#[derive(OpenApi)]
#[openapi(tags(
    (name = "stops", description = "Stop cache queries and per-stop user state"),
    (name = "sync", description = "Stop registry synchronization")
))]
struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(stops::list::favorite_stops))
        .routes(routes!(stops::list::nearby_stops))
        .routes(routes!(stops::list::search_stops))
        .routes(routes!(stops::favorite::set_favorite))
        .routes(routes!(stops::filters::get_filters, stops::filters::put_filters))
        .routes(routes!(stops::departures::list_departures))
        .routes(routes!(sync::run_sync))
        .routes(routes!(sync::sync_status))
        .with_state(state)
        .split_for_parts();

    router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{LocationType, StopRecord, VehicleType};
    use crate::store::memory_store;
    use crate::sync::reconcile_table;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    async fn test_app() -> (Router, SqlitePool) {
        let pool = memory_store().await;
        let config = Config::default();
        let client = DigitransitClient::new(config.api_url.clone()).unwrap();
        let sync = Arc::new(SyncManager::new(pool.clone(), client.clone(), &config));
        let state = AppState {
            pool: pool.clone(),
            client,
            sync,
            default_limit: config.result_limit(),
        };
        (router(state), pool)
    }

    fn stop(id: &str, name: &str, lat: f64, lon: f64) -> StopRecord {
        StopRecord {
            gtfs_id: id.to_string(),
            name: name.to_string(),
            code: String::new(),
            lat,
            lon,
            vehicle_type: VehicleType::Bus,
            location_type: LocationType::Stop,
            platform: None,
            parent_station: None,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn nearby_returns_ordered_rows() {
        let (app, pool) = test_app().await;
        reconcile_table(
            &pool,
            "stops",
            &[
                stop("far", "Far", 60.30, 24.94),
                stop("near", "Near", 60.171, 24.941),
            ],
        )
        .await
        .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stops/nearby?lat=60.17&lon=24.94&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["gtfs_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["near", "far"]);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let (app, _pool) = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stops/nearby?lat=60.17&lon=24.94&limit=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn favorite_round_trips_through_the_api() {
        let (app, pool) = test_app().await;
        reconcile_table(&pool, "stops", &[stop("S1", "Kamppi", 60.17, 24.93)])
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/api/stops/S1/favorite")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"is_favorite": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stops/favorites")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let favorites = body.as_array().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0]["gtfs_id"], "S1");
        assert_eq!(favorites[0]["is_favorite"], true);
    }

    #[tokio::test]
    async fn filters_round_trip_through_the_api() {
        let (app, _pool) = test_app().await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/api/stops/S1/filters")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"filters": [{"route": "550", "headsign": "Westendinasema"}]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stops/S1/filters")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["filters"][0]["route"], "550");
    }

    #[tokio::test]
    async fn search_excludes_citybikes_by_default() {
        let (app, pool) = test_app().await;
        reconcile_table(&pool, "stops", &[stop("S1", "Kamppi", 60.17, 24.93)])
            .await
            .unwrap();
        reconcile_table(
            &pool,
            "stations",
            &[StopRecord {
                location_type: LocationType::CitybikeStation,
                vehicle_type: VehicleType::Citybike,
                ..stop("B1", "Kamppi (city bike)", 60.17, 24.93)
            }],
        )
        .await
        .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/stops/search?q=Kamppi")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["gtfs_id"], "S1");
    }
}
