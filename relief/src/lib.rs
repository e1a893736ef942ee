//! # relief - SRTM heights and terrain profiles
//!
//! Point elevations and great-circle terrain profiles from SRTM (Shuttle
//! Radar Topography Mission) `.hgt` tiles.
//!
//! ## Features
//!
//! - **Memory-mapped tiles**: raw `.hgt` files are mapped, zipped ones read
//!   once and cached
//! - **Void filling**: "no data" samples are replaced by the mean of their
//!   nearest valid neighbours
//! - **Bilinear heights**: fractional coordinates are interpolated between
//!   the four surrounding samples
//! - **Profiles**: distance, ascent/descent, elevation and gradient
//!   statistics along a path, downsampled to a bounded number of points
//!
//! ## Quick Start
//!
//! ```ignore
//! use relief::{GeoPoint, HeightSampler, ProfileEngine, ProfileOptions, TileStore};
//!
//! let store = TileStore::new("/data/srtm", 16);
//!
//! let height = HeightSampler::new(&store).height_at(GeoPoint::new(-3.1883, 55.9533))?;
//! println!("Edinburgh: {}m", height);
//!
//! let profile = ProfileEngine::new(&store).compute(
//!     GeoPoint::new(-5.0037, 56.7969),
//!     GeoPoint::new(-4.9700, 56.8100),
//!     &ProfileOptions::default(),
//! )?;
//! println!("{} km, max {}m", profile.summary.horizontal_distance_km, profile.summary.max_elevation);
//! ```
//!
//! ## SRTM Data Format
//!
//! - **SRTM1**: 3601×3601 samples, 1 arc-second (~30m) resolution
//! - **SRTM3**: 1201×1201 samples, 3 arc-second (~90m) resolution
//!
//! Each sample is a 16-bit big-endian signed integer in metres above the
//! EGM96 geoid; -32768 marks a void. Row 0 is the northern edge of the
//! 1°×1° cell named by its southwest corner (`N51W001.hgt`). A tile may also
//! be provided zipped as `N51W001.hgt.zip` or `N51W001.SRTMGL1.hgt.zip`.

pub mod error;
pub mod filename;
pub mod geodesic;
pub mod profile;
pub mod sampler;
pub mod store;
pub mod tile;
pub mod void;

#[cfg(feature = "geojson")]
pub mod geojson;

// Re-export main types at crate root for convenience
pub use error::{ReliefError, Result};
pub use geodesic::{angular_distance, interpolate, GeoPoint, GeodesicPath, EARTH_RADIUS_M};
pub use profile::{
    DownsampledPoint, Profile, ProfileEngine, ProfileOptions, ProfileSummary, QualityTally,
    Reducer, DEFAULT_MAX_POINTS,
};
pub use sampler::{DataQuality, HeightSampler, PointHeight};
pub use store::{BoundingBox, CacheStats, TileStore, TileStoreBuilder};
pub use tile::{Resolution, Tile, TileId, VOID_VALUE};
