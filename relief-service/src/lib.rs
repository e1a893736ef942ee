//! Relief Service Library
//!
//! HTTP handlers, router and chart rendering for the height and profile
//! service. Used by both the relief-service binary and integration tests.

pub mod chart;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use relief::TileStore;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::chart::{ChartRenderer, StaticChartUrl};

// Re-export commonly used types for convenience
pub use handlers::{
    ErrorResponse, HealthResponse, HeightQuery, HeightResponse, ProfileOutput, ProfilePoint,
    ProfileQuery, ProfileResponse, StatsResponse,
};

/// Default upper bound on the `points` parameter.
pub const DEFAULT_MAX_POINTS_CAP: usize = 400;

/// Default deadline for a single query.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Largest `points` value honoured; larger requests are clamped.
    pub max_points: usize,
    /// Time a query may spend before the client gets a 503.
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS_CAP,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Read `RELIEF_MAX_POINTS` and `RELIEF_REQUEST_TIMEOUT_MS`, keeping the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_points: std::env::var("RELIEF_MAX_POINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n >= 2)
                .unwrap_or(defaults.max_points),
            request_timeout: std::env::var("RELIEF_REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    /// Tile store behind every query.
    pub store: TileStore,
    pub config: ServiceConfig,
    /// Renders the `url` field of profile responses.
    pub chart: Box<dyn ChartRenderer>,
}

impl AppState {
    /// State with the static chart URL renderer.
    pub fn new(store: TileStore, config: ServiceConfig) -> Self {
        Self {
            store,
            config,
            chart: Box::new(StaticChartUrl::default()),
        }
    }
}

/// OpenAPI documentation for the relief service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Relief Height Service",
        version = "0.1.0",
        description = "Point heights and great-circle terrain profiles from SRTM tiles.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_height,
        handlers::get_profile,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::HeightResponse,
            handlers::ProfileOutput,
            handlers::ProfilePoint,
            handlers::ProfileResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "terrain", description = "Height and profile queries"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the service router with documentation, tracing and CORS.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/height", get(handlers::get_height))
        .route("/profile", get(handlers::get_profile))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_points, 400);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_openapi_lists_endpoints() {
        let doc = ApiDoc::openapi();
        for path in ["/height", "/profile", "/health", "/stats"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
