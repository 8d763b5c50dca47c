mod api;
mod config;
mod models;
mod mutations;
mod providers;
mod queries;
mod store;
mod sync;

use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;
use providers::digitransit::DigitransitClient;
use sync::SyncManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stopcache=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path)?
    } else {
        info!(path = %config_path, "No config file found, using defaults");
        Config::default()
    };

    info!("Starting stop cache server");
    let pool = store::open(&config.database_path).await?;
    let client = DigitransitClient::new(config.api_url.clone())?;

    // The sync manager owns the background refresh loop; API handlers share
    // it for on-demand syncs.
    let sync_manager = Arc::new(SyncManager::new(pool.clone(), client.clone(), &config));
    tokio::spawn(sync_manager.clone().start());

    let state = AppState {
        pool,
        client,
        sync: sync_manager,
        default_limit: config.result_limit(),
    };

    let cors = build_cors(&config)?;

    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors(config: &Config) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    if config.cors_permissive {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
