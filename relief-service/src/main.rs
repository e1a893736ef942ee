//! Relief Service - HTTP service for SRTM heights and terrain profiles.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RELIEF_DATA_DIR` | Directory containing .hgt / .hgt.zip files | current directory |
//! | `RELIEF_CACHE_SIZE` | Maximum tiles in cache | 16 |
//! | `RELIEF_RESOLUTION` | `srtm3` or `srtm1` | `srtm3` |
//! | `RELIEF_COVERAGE` | `min_lat,min_lon,max_lat,max_lon` | `-60,-180,60,180` |
//! | `RELIEF_LOAD_TIMEOUT_MS` | Per-tile read deadline | none |
//! | `RELIEF_MAX_POINTS` | Largest `points` honoured | 400 |
//! | `RELIEF_REQUEST_TIMEOUT_MS` | Per-query deadline | 30000 |
//! | `RELIEF_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /height?lon=X&lat=Y` - Height at a point
//! - `GET /profile?x1=&y1=&x2=&y2=` - Terrain profile between two points
//! - `GET /health` - Health check
//! - `GET /stats` - Cache statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use relief::TileStoreBuilder;
use relief_service::{router, AppState, ServiceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relief_service=info,relief=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("RELIEF_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let builder = if std::env::var_os("RELIEF_DATA_DIR").is_some() {
        TileStoreBuilder::from_env()?
    } else {
        tracing::warn!("RELIEF_DATA_DIR not set, using current directory");
        TileStoreBuilder::new(".")
    };
    let store = builder.build();
    let config = ServiceConfig::from_env();

    tracing::info!(
        data_dir = %store.data_dir().display(),
        cache_capacity = store.cache_capacity(),
        resolution = ?store.resolution(),
        max_points = config.max_points,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        port = port,
        "Starting relief service"
    );

    let app = router(Arc::new(AppState::new(store, config)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
