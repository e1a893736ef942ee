//! Terrain profiles along a great-circle path.
//!
//! [`ProfileEngine::compute`] walks the path one sample spacing at a time,
//! keeps running statistics over every sample, and reduces the samples to at
//! most `max_points` output points.
//!
//! Two things happen per output bucket, independently:
//!
//! - the sample closest to the bucket boundary gives the point its position
//!   (and curvature height);
//! - every sample that falls in the bucket is folded into its height, either
//!   as a maximum or as a mean.
//!
//! The position sample is therefore not necessarily one of the samples the
//! height came from.

use crate::error::{ReliefError, Result};
use crate::geodesic::{GeoPoint, GeodesicPath, EARTH_RADIUS_M};
use crate::sampler::{DataQuality, HeightSampler};
use crate::store::TileStore;

/// Default cap on output points.
pub const DEFAULT_MAX_POINTS: usize = 100;

/// How the samples of one bucket are reduced to its height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    /// Arithmetic mean.
    #[default]
    Average,
    /// Highest sample.
    Max,
}

/// Options for [`ProfileEngine::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileOptions {
    /// Add the earth's curvature (sagitta) to every sample height.
    pub include_curvature: bool,
    /// Upper bound on the number of output points. At least 2.
    pub max_points: usize,
    pub reducer: Reducer,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            include_curvature: false,
            max_points: DEFAULT_MAX_POINTS,
            reducer: Reducer::Average,
        }
    }
}

impl ProfileOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_points < 2 {
            return Err(ReliefError::InvalidOption(format!(
                "max_points must be at least 2, got {}",
                self.max_points
            )));
        }
        Ok(())
    }
}

/// One step along the path, before downsampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    /// Angle from the start of the path, in radians.
    pub angle: f64,
    pub point: GeoPoint,
    /// Sampled terrain height in metres.
    pub raw_height: i32,
    /// Sagitta at this step, when curvature is requested.
    pub curvature: Option<f64>,
}

impl ProfileSample {
    /// Height used for statistics: terrain plus curvature, if any.
    pub fn height(&self) -> f64 {
        f64::from(self.raw_height) + self.curvature.unwrap_or(0.0)
    }
}

/// Height of the earth's surface above the chord joining the ends of a path
/// `total` radians long, `at` radians from its start.
///
/// Zero at both ends and largest halfway.
pub fn curvature_height(total: f64, at: f64) -> f64 {
    EARTH_RADIUS_M * ((total / 2.0 - at).cos() - (total / 2.0).cos())
}

/// Number of samples of each [`DataQuality`] seen along a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QualityTally {
    pub measured: usize,
    pub tile_unavailable: usize,
    pub out_of_coverage: usize,
    pub void_exhausted: usize,
}

impl QualityTally {
    pub fn record(&mut self, quality: DataQuality) {
        match quality {
            DataQuality::Measured => self.measured += 1,
            DataQuality::TileUnavailable => self.tile_unavailable += 1,
            DataQuality::OutOfCoverage => self.out_of_coverage += 1,
            DataQuality::VoidExhausted => self.void_exhausted += 1,
        }
    }

    /// The worst quality present; `Measured` only if every sample was.
    pub fn overall(&self) -> DataQuality {
        if self.out_of_coverage > 0 {
            DataQuality::OutOfCoverage
        } else if self.tile_unavailable > 0 {
            DataQuality::TileUnavailable
        } else if self.void_exhausted > 0 {
            DataQuality::VoidExhausted
        } else {
            DataQuality::Measured
        }
    }

    pub fn total(&self) -> usize {
        self.measured + self.tile_unavailable + self.out_of_coverage + self.void_exhausted
    }
}

/// Summary statistics of a profile.
///
/// Distances are kilometres rounded to 3 decimals, elevations metres,
/// gradients metres per metre rounded to 3 decimals. Gradients are the drop
/// per step, so a climb in the direction of travel is negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub horizontal_distance_km: f64,
    /// Distance over the terrain, `Σ hypot(step, Δh)`.
    pub surface_distance_km: f64,
    pub ascent_km: f64,
    pub level_km: f64,
    pub descent_km: f64,
    /// Floored.
    pub min_elevation: i32,
    /// Ceiled.
    pub max_elevation: i32,
    /// Rounded to the nearest metre.
    pub average_elevation: i32,
    pub min_gradient: f64,
    pub max_gradient: f64,
    pub average_gradient: f64,
    /// Number of steps; there are `steps + 1` samples.
    pub steps: usize,
    /// Number of output points.
    pub point_count: usize,
    pub quality: QualityTally,
}

/// One output point of a profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownsampledPoint {
    /// Longitude, rounded to 6 decimals.
    pub lon: f64,
    /// Latitude, rounded to 6 decimals.
    pub lat: f64,
    /// Rounded sagitta at this position, when curvature is requested.
    pub curvature_height: Option<i32>,
    /// Reduced height of the bucket, rounded to the nearest metre.
    pub height: i32,
}

/// Summary plus downsampled points.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub summary: ProfileSummary,
    pub points: Vec<DownsampledPoint>,
}

impl Profile {
    /// `(min, max)` elevation, the range chart renderers normalize against.
    pub fn elevation_bounds(&self) -> (i32, i32) {
        (self.summary.min_elevation, self.summary.max_elevation)
    }
}

/// Running min/max/sum.
#[derive(Debug, Clone, Copy)]
struct Extremes {
    min: f64,
    max: f64,
    sum: f64,
}

impl Extremes {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    fn add(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
    }
}

/// Folds samples into `n + 1` points at boundaries `k · total / n`.
///
/// A bucket closes when a sample is at least as close to the next boundary
/// as to the current one. That sample is the first of the next bucket.
#[derive(Debug)]
pub struct Downsampler {
    reducer: Reducer,
    /// Angle between boundaries.
    interval: f64,
    /// Sentinel "no candidate yet" distance.
    reset_distance: f64,
    boundary: usize,
    closest: f64,
    candidate: Option<DownsampledPoint>,
    bucket: Extremes,
    bucket_len: usize,
    points: Vec<DownsampledPoint>,
}

impl Downsampler {
    /// `total` is the angular length of the path, `intervals` the number of
    /// buckets boundaries are spaced for (at least 1).
    pub fn new(total: f64, intervals: usize, reducer: Reducer) -> Self {
        let intervals = intervals.max(1);
        Self {
            reducer,
            interval: total / intervals as f64,
            reset_distance: total + 0.1,
            boundary: 0,
            closest: total + 0.1,
            candidate: None,
            bucket: Extremes::new(),
            bucket_len: 0,
            points: Vec::with_capacity(intervals + 1),
        }
    }

    /// Feed the next sample. Samples must come in path order.
    pub fn push(&mut self, sample: &ProfileSample) {
        let angle = sample.angle;

        if self.bucket_len > 0 {
            let to_next = ((self.boundary + 1) as f64 * self.interval - angle).abs();
            let to_current = (angle - self.boundary as f64 * self.interval).abs();
            if to_next <= to_current {
                self.close_bucket();
                self.boundary += 1;
                self.closest = self.reset_distance;
            }
        }

        let distance = (angle - self.boundary as f64 * self.interval).abs();
        if distance < self.closest {
            self.closest = distance;
            self.candidate = Some(DownsampledPoint {
                lon: round_to(sample.point.lon, 6),
                lat: round_to(sample.point.lat, 6),
                curvature_height: sample.curvature.map(|c| c.round() as i32),
                height: 0,
            });
        }

        self.bucket.add(sample.height());
        self.bucket_len += 1;
    }

    /// Number of points closed so far.
    pub fn closed(&self) -> usize {
        self.points.len()
    }

    /// Close the last bucket and return every point.
    pub fn finish(mut self) -> Vec<DownsampledPoint> {
        if self.bucket_len > 0 {
            self.close_bucket();
        }
        self.points
    }

    fn close_bucket(&mut self) {
        let height = match self.reducer {
            Reducer::Max => self.bucket.max,
            Reducer::Average => self.bucket.sum / self.bucket_len as f64,
        };
        if let Some(mut point) = self.candidate.take() {
            point.height = height.round() as i32;
            self.points.push(point);
        }
        self.bucket = Extremes::new();
        self.bucket_len = 0;
    }
}

/// Computes terrain profiles from a [`TileStore`].
///
/// # Example
///
/// ```ignore
/// use relief::{GeoPoint, ProfileEngine, ProfileOptions, TileStore};
///
/// let store = TileStore::new("/data/srtm", 16);
/// let profile = ProfileEngine::new(&store).compute(
///     GeoPoint::new(-5.0, 56.8),
///     GeoPoint::new(-4.9, 56.7),
///     &ProfileOptions::default(),
/// )?;
/// println!("{} km, climbing {} km", profile.summary.horizontal_distance_km, profile.summary.ascent_km);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ProfileEngine<'a> {
    sampler: HeightSampler<'a>,
}

impl<'a> ProfileEngine<'a> {
    pub fn new(store: &'a TileStore) -> Self {
        Self {
            sampler: HeightSampler::new(store),
        }
    }

    /// Profile of the path from `from` to `to`.
    ///
    /// The path is sampled every tile sample spacing (`steps` intervals,
    /// `steps + 1` samples) and reduced to
    /// `min(steps, max_points − 1) + 1` points.
    ///
    /// # Errors
    ///
    /// Invalid coordinates or options, and corrupt tiles on the path.
    pub fn compute(&self, from: GeoPoint, to: GeoPoint, options: &ProfileOptions) -> Result<Profile> {
        options.validate()?;
        let from = from.validate()?;
        let to = to.validate()?;

        let path = GeodesicPath::new(from, to);
        let total = path.angular_distance();
        let resolution = self.sampler.store().resolution().angular_resolution();

        let steps = path.step_count(resolution);
        let intervals = steps.min(options.max_points - 1);
        let step_distance = path.distance_m() / steps as f64;

        let mut downsampler = Downsampler::new(total, intervals, options.reducer);
        let mut heights = Extremes::new();
        let mut gradients = Extremes::new();
        let mut surface = 0.0;
        let mut ascent = 0.0;
        let mut level = 0.0;
        let mut descent = 0.0;
        let mut quality = QualityTally::default();
        let mut previous: Option<f64> = None;

        for i in 0..=steps {
            let fraction = i as f64 / steps as f64;
            let angle = total * fraction;
            let point = path.point_at(fraction);

            let measured = self.sampler.sample(point)?;
            quality.record(measured.quality);

            let sample = ProfileSample {
                angle,
                point,
                raw_height: measured.height,
                curvature: options
                    .include_curvature
                    .then(|| curvature_height(total, angle)),
            };
            let height = sample.height();
            heights.add(height);

            if let Some(previous) = previous {
                let delta = height - previous;
                let along = step_distance.hypot(delta);
                surface += along;
                if delta > 0.0 {
                    ascent += along;
                } else if delta < 0.0 {
                    descent += along;
                } else {
                    level += along;
                }

                let drop = previous - height;
                let gradient = if step_distance != 0.0 {
                    drop / step_distance
                } else if drop != 0.0 {
                    drop / (resolution * EARTH_RADIUS_M)
                } else {
                    0.0
                };
                gradients.add(gradient);
            }
            previous = Some(height);

            downsampler.push(&sample);
        }

        let points = downsampler.finish();

        let summary = ProfileSummary {
            horizontal_distance_km: round_to(path.distance_m() / 1000.0, 3),
            surface_distance_km: round_to(surface / 1000.0, 3),
            ascent_km: round_to(ascent / 1000.0, 3),
            level_km: round_to(level / 1000.0, 3),
            descent_km: round_to(descent / 1000.0, 3),
            min_elevation: heights.min.floor() as i32,
            max_elevation: heights.max.ceil() as i32,
            average_elevation: (heights.sum / (steps + 1) as f64).round() as i32,
            min_gradient: round_to(gradients.min, 3),
            max_gradient: round_to(gradients.max, 3),
            average_gradient: round_to(gradients.sum / steps as f64, 3),
            steps,
            point_count: points.len(),
            quality,
        };

        tracing::debug!(
            from = %from,
            to = %to,
            steps,
            points = points.len(),
            quality = %quality.overall(),
            "Computed profile"
        );

        Ok(Profile { summary, points })
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
