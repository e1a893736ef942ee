//! HTTP request handlers for the height and profile service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relief::{
    DataQuality, GeoPoint, HeightSampler, ProfileEngine, ProfileOptions, Reducer, ReliefError,
    DEFAULT_MAX_POINTS,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::chart::ChartInput;
use crate::AppState;

/// Values accepted as "on" for flag parameters. A flag given with no value
/// (`&cv`) is on as well.
const TRUE_VALUES: [&str; 5] = ["true", "t", "yes", "y", "1"];

/// Query parameters for the height endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HeightQuery {
    /// Longitude in decimal degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Wrap the response in a call to this JavaScript function (JSONP).
    pub callback: Option<String>,
}

/// Query parameters for the profile endpoint.
///
/// `x` is longitude and `y` latitude, both in decimal degrees.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileQuery {
    /// Start longitude.
    pub x1: f64,
    /// Start latitude.
    pub y1: f64,
    /// End longitude.
    pub x2: f64,
    /// End latitude.
    pub y2: f64,
    /// Add the earth's curvature to the heights.
    pub cv: Option<String>,
    /// Report the highest sample of each point's neighbourhood instead of the mean.
    pub maxpt: Option<String>,
    /// Maximum number of points to return (at least 2; capped by the server).
    pub points: Option<usize>,
    /// Include a chart image URL in the output.
    pub chart: Option<String>,
    /// Wrap the response in a call to this JavaScript function (JSONP).
    pub callback: Option<String>,
}

/// A profile request after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRequest {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub options: ProfileOptions,
    pub chart: bool,
    pub callback: Option<String>,
}

impl ProfileQuery {
    /// Check coordinates and options once, before any work is done.
    ///
    /// `points_cap` is the server's limit on `points`.
    pub fn validate(self, points_cap: usize) -> Result<ProfileRequest, ApiError> {
        let from = GeoPoint::new(self.x1, self.y1).validate()?;
        let to = GeoPoint::new(self.x2, self.y2).validate()?;

        let max_points = match self.points {
            Some(n) if n < 2 => {
                return Err(ApiError::BadRequest(format!(
                    "points must be at least 2, got {n}"
                )))
            }
            Some(n) => n,
            None => DEFAULT_MAX_POINTS,
        };

        let options = ProfileOptions {
            include_curvature: flag(&self.cv),
            max_points: max_points.min(points_cap.max(2)),
            reducer: if flag(&self.maxpt) {
                Reducer::Max
            } else {
                Reducer::Average
            },
        };

        Ok(ProfileRequest {
            from,
            to,
            options,
            chart: flag(&self.chart),
            callback: validate_callback(self.callback)?,
        })
    }
}

fn flag(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| {
        let v = v.trim().to_ascii_lowercase();
        v.is_empty() || TRUE_VALUES.contains(&v.as_str())
    })
}

/// Whether `name` is a dotted JavaScript identifier such as `app.onHeight`.
pub fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 128
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

fn validate_callback(callback: Option<String>) -> Result<Option<String>, ApiError> {
    match callback {
        Some(name) if !is_valid_callback(&name) => {
            Err(ApiError::BadRequest(format!("invalid callback name {name:?}")))
        }
        other => Ok(other),
    }
}

/// Successful height response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeightResponse {
    /// Height in metres above the EGM96 geoid (0 when no data).
    pub ht: i32,
    /// `measured`, `tile_unavailable`, `out_of_coverage` or `void_exhausted`.
    pub quality: String,
    /// Seconds spent on the query.
    pub time_taken: f64,
}

/// Profile summary. Distances in kilometres, heights in metres.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOutput {
    /// Horizontal distance.
    pub dist: f64,
    /// Distance over the terrain.
    pub surface: f64,
    /// Surface distance climbing.
    pub ascent: f64,
    /// Surface distance on the level.
    pub level: f64,
    /// Surface distance descending.
    pub descent: f64,
    pub min: i32,
    pub max: i32,
    pub average: i32,
    /// Steepest climb (drop over run, so negative when climbing).
    pub min_gr: f64,
    /// Steepest descent (drop over run).
    pub max_gr: f64,
    /// Mean drop over run.
    pub ave_gr: f64,
    /// Number of steps sampled along the path.
    pub steps: usize,
    /// Number of entries in `points`.
    pub point_count: usize,
    /// Worst data quality met along the path.
    pub quality: String,
    /// Seconds spent on the query.
    pub time_taken: f64,
    /// Chart image URL, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One profile point.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfilePoint {
    /// Longitude.
    pub xcoord: f64,
    /// Latitude.
    pub ycoord: f64,
    /// Earth curvature height, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curheight: Option<i32>,
    /// Terrain height of the point's neighbourhood.
    pub trueheight: i32,
}

/// Successful profile response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub output: ProfileOutput,
    pub points: Vec<ProfilePoint>,
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Cache statistics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Number of tiles in cache (including ones known to be missing).
    pub cached_tiles: u64,
    /// Maximum number of tiles kept.
    pub cache_capacity: u64,
    /// Cache hit count.
    pub cache_hits: u64,
    /// Cache miss count.
    pub cache_misses: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Relief(ReliefError),
    Timeout(Duration),
    Internal(String),
}

impl From<ReliefError> for ApiError {
    fn from(e: ReliefError) -> Self {
        ApiError::Relief(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Relief(
                e @ (ReliefError::InvalidCoordinate { .. }
                | ReliefError::InvalidOption(_)
                | ReliefError::OutOfCoverage { .. }),
            ) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Relief(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Timeout(limit) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("query timed out after {} ms", limit.as_millis()),
            ),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message.clone()),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Query failed");
        } else {
            tracing::warn!(status = %status, error = %message, "Query rejected");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Run a blocking query on tokio's blocking pool under a deadline.
async fn run_blocking<T, F>(timeout: Duration, query: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> relief::Result<T> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(query)).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(join_error)) => Err(ApiError::Internal(join_error.to_string())),
        Err(_) => Err(ApiError::Timeout(timeout)),
    }
}

/// Serialize `body` as JSON, or as a JSONP call when `callback` is set.
fn respond<T: Serialize>(body: &T, callback: Option<&str>) -> Response {
    match callback {
        None => (StatusCode::OK, Json(body)).into_response(),
        Some(callback) => match serde_json::to_string(body) {
            Ok(json) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/javascript")],
                format!("{callback}({json});"),
            )
                .into_response(),
            Err(e) => ApiError::Internal(e.to_string()).into_response(),
        },
    }
}

/// Get the terrain height at a point.
///
/// Points with no data (missing tile, outside coverage) answer 0 with a
/// `quality` other than `measured`.
#[utoipa::path(
    get,
    path = "/height",
    params(HeightQuery),
    responses(
        (status = 200, description = "Height found", body = HeightResponse),
        (status = 400, description = "Invalid coordinates or callback", body = ErrorResponse),
        (status = 500, description = "Corrupt or unreadable tile", body = ErrorResponse),
        (status = 503, description = "Query timed out", body = ErrorResponse)
    ),
    tag = "terrain"
)]
#[axum::debug_handler]
pub async fn get_height(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HeightQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();

    let result = async {
        let Query(query) = query?;
        let point = GeoPoint::new(query.lon, query.lat).validate()?;
        let callback = validate_callback(query.callback)?;

        tracing::debug!(lon = point.lon, lat = point.lat, "Height query");

        let worker = state.clone();
        let height = run_blocking(state.config.request_timeout, move || {
            HeightSampler::new(&worker.store).sample(point)
        })
        .await?;

        if height.quality != DataQuality::Measured {
            tracing::info!(lon = point.lon, lat = point.lat, quality = %height.quality, "No height data");
        }

        Ok::<_, ApiError>((
            HeightResponse {
                ht: height.height,
                quality: height.quality.to_string(),
                time_taken: started.elapsed().as_secs_f64(),
            },
            callback,
        ))
    }
    .await;

    match result {
        Ok((body, callback)) => respond(&body, callback.as_deref()),
        Err(e) => e.into_response(),
    }
}

/// Get the terrain profile between two points.
#[utoipa::path(
    get,
    path = "/profile",
    params(ProfileQuery),
    responses(
        (status = 200, description = "Profile computed", body = ProfileResponse),
        (status = 400, description = "Invalid coordinates, options or callback", body = ErrorResponse),
        (status = 500, description = "Corrupt or unreadable tile", body = ErrorResponse),
        (status = 503, description = "Query timed out", body = ErrorResponse)
    ),
    tag = "terrain"
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProfileQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();

    let result = async {
        let Query(query) = query?;
        let request = query.validate(state.config.max_points)?;

        tracing::debug!(
            from = %request.from,
            to = %request.to,
            max_points = request.options.max_points,
            curvature = request.options.include_curvature,
            "Profile query"
        );

        let worker = state.clone();
        let (from, to, options) = (request.from, request.to, request.options);
        let profile = run_blocking(state.config.request_timeout, move || {
            ProfileEngine::new(&worker.store).compute(from, to, &options)
        })
        .await?;

        let (min_elevation, max_elevation) = profile.elevation_bounds();
        let url = request.chart.then(|| {
            state.chart.render(&ChartInput {
                min_elevation,
                max_elevation,
                distance_km: profile.summary.horizontal_distance_km,
                points: &profile.points,
            })
        });

        let s = &profile.summary;
        tracing::info!(
            from = %request.from,
            to = %request.to,
            dist_km = s.horizontal_distance_km,
            points = s.point_count,
            "Profile computed"
        );

        let body = ProfileResponse {
            output: ProfileOutput {
                dist: s.horizontal_distance_km,
                surface: s.surface_distance_km,
                ascent: s.ascent_km,
                level: s.level_km,
                descent: s.descent_km,
                min: s.min_elevation,
                max: s.max_elevation,
                average: s.average_elevation,
                min_gr: s.min_gradient,
                max_gr: s.max_gradient,
                ave_gr: s.average_gradient,
                steps: s.steps,
                point_count: s.point_count,
                quality: s.quality.overall().to_string(),
                time_taken: started.elapsed().as_secs_f64(),
                url,
            },
            points: profile
                .points
                .iter()
                .map(|p| ProfilePoint {
                    xcoord: p.lon,
                    ycoord: p.lat,
                    curheight: p.curvature_height,
                    trueheight: p.height,
                })
                .collect(),
        };

        Ok::<_, ApiError>((body, request.callback))
    }
    .await;

    match result {
        Ok((body, callback)) => respond(&body, callback.as_deref()),
        Err(e) => e.into_response(),
    }
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get cache statistics.
///
/// Returns information about the tile cache.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Cache statistics", body = StatsResponse)),
    tag = "system"
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.store.cache_stats();

    Json(StatsResponse {
        cached_tiles: stats.entry_count,
        cache_capacity: state.store.cache_capacity(),
        cache_hits: stats.hit_count,
        cache_misses: stats.miss_count,
        hit_rate: stats.hit_rate(),
    })
}
