//! Bilinear height lookups.

use std::fmt;

use crate::error::Result;
use crate::geodesic::GeoPoint;
use crate::store::TileStore;
use crate::tile::TileId;
use crate::void;

/// How much a returned height can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataQuality {
    /// Interpolated from the tile (voids filled from neighbours).
    #[default]
    Measured,
    /// No tile on disk for this cell; height is 0.
    TileUnavailable,
    /// Outside the store's coverage box; height is 0.
    OutOfCoverage,
    /// The tile holds no valid sample at all; height is 0.
    VoidExhausted,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::Measured => "measured",
            DataQuality::TileUnavailable => "tile_unavailable",
            DataQuality::OutOfCoverage => "out_of_coverage",
            DataQuality::VoidExhausted => "void_exhausted",
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, DataQuality::Measured)
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A height together with its [`DataQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointHeight {
    /// Metres above the EGM96 geoid, truncated toward zero.
    pub height: i32,
    pub quality: DataQuality,
}

impl PointHeight {
    fn fallback(quality: DataQuality) -> Self {
        Self { height: 0, quality }
    }
}

/// Answers height queries against a [`TileStore`].
///
/// # Example
///
/// ```ignore
/// use relief::{GeoPoint, HeightSampler, TileStore};
///
/// let store = TileStore::new("/data/srtm", 16);
/// let sampler = HeightSampler::new(&store);
/// let ben_nevis = sampler.height_at(GeoPoint::new(-5.0037, 56.7969))?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HeightSampler<'a> {
    store: &'a TileStore,
}

impl<'a> HeightSampler<'a> {
    pub fn new(store: &'a TileStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a TileStore {
        self.store
    }

    /// Height at `point` in metres; 0 wherever no data is available.
    pub fn height_at(&self, point: GeoPoint) -> Result<i32> {
        self.sample(point).map(|p| p.height)
    }

    /// Height at `point` with its data quality.
    ///
    /// The four grid vertices around the point are void-filled and blended
    /// bilinearly. The result is truncated toward zero, so -12.5 becomes -12.
    ///
    /// # Errors
    ///
    /// Only for tiles that exist but cannot be read or are corrupt. Missing
    /// tiles, points outside coverage and all-void tiles yield height 0 and
    /// the matching [`DataQuality`].
    pub fn sample(&self, point: GeoPoint) -> Result<PointHeight> {
        if !self.store.covers(point) {
            return Ok(PointHeight::fallback(DataQuality::OutOfCoverage));
        }

        let id = TileId::containing(point);
        let tile = match self.store.load(id)? {
            Some(tile) => tile,
            None => return Ok(PointHeight::fallback(DataQuality::TileUnavailable)),
        };

        let cols = tile.cols();
        let rows = tile.rows();
        let cx = (point.lon - point.lon.floor()).abs() * (cols - 1) as f64;
        let cy = (point.lat - point.lat.floor()).abs() * (rows - 1) as f64;

        // A fraction a hair below 1 can still round up to the last index.
        let x0 = (cx.floor() as usize).min(cols - 2);
        let y0 = (cy.floor() as usize).min(rows - 2);
        let (x1, y1) = (x0 + 1, y0 + 1);
        let dx = cx - x0 as f64;
        let dy = cy - y0 as f64;

        let corners = [
            void::resolve(&tile, x0, y0),
            void::resolve(&tile, x1, y0),
            void::resolve(&tile, x0, y1),
            void::resolve(&tile, x1, y1),
        ];
        let [Some(h_sw), Some(h_se), Some(h_nw), Some(h_ne)] = corners else {
            tracing::debug!(tile = %id, point = %point, "No valid samples in tile");
            return Ok(PointHeight::fallback(DataQuality::VoidExhausted));
        };

        let h_s = (1.0 - dx) * h_sw + dx * h_se;
        let h_n = (1.0 - dx) * h_nw + dx * h_ne;
        let height = (1.0 - dy) * h_s + dy * h_n;

        Ok(PointHeight {
            height: height.trunc() as i32,
            quality: DataQuality::Measured,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{create_test_tile, write_tile_with as write_tile};
    use crate::store::BoundingBox;
    use crate::tile::VOID_VALUE;
    use tempfile::TempDir;

    #[test]
    fn test_grid_vertex_returns_stored_value() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N51W001.hgt", 1345);

        let store = TileStore::new(temp_dir.path(), 4);
        let sampler = HeightSampler::new(&store);

        // Row 600, col 600 is the centre of N51W001.
        let p = sampler.sample(GeoPoint::new(-0.5, 51.5)).unwrap();
        assert_eq!(p.height, 1345);
        assert_eq!(p.quality, DataQuality::Measured);

        // Neighbouring vertex is flat 0.
        assert_eq!(sampler.height_at(GeoPoint::new(-0.5, 51.0)).unwrap(), 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let temp_dir = TempDir::new().unwrap();
        write_tile(temp_dir.path(), "N51W001.hgt", |x, _| if x <= 600 { -12 } else { -13 });
        write_tile(temp_dir.path(), "N51E000.hgt", |x, _| if x <= 600 { 12 } else { 13 });

        let store = TileStore::new(temp_dir.path(), 4);
        let sampler = HeightSampler::new(&store);

        let lon_frac = 600.5 / 1200.0;
        assert_eq!(sampler.height_at(GeoPoint::new(-1.0 + lon_frac, 51.3)).unwrap(), -12);
        assert_eq!(sampler.height_at(GeoPoint::new(lon_frac, 51.3)).unwrap(), 12);
    }

    #[test]
    fn test_bilinear_blend() {
        let temp_dir = TempDir::new().unwrap();
        // h = 10x + 1000y is linear, so bilinear interpolation is exact.
        write_tile(temp_dir.path(), "N10E020.hgt", |x, y| {
            (x % 20) as i16 * 10 + (y % 20) as i16 * 1000
        });

        let store = TileStore::new(temp_dir.path(), 4);
        let sampler = HeightSampler::new(&store);

        // cx = 2.25, cy = 3.5
        let p = GeoPoint::new(20.0 + 2.25 / 1200.0, 10.0 + 3.5 / 1200.0);
        assert_eq!(sampler.height_at(p).unwrap(), 3522);
    }

    #[test]
    fn test_negative_coordinates_use_fraction_from_floor() {
        let temp_dir = TempDir::new().unwrap();
        write_tile(temp_dir.path(), "S13W078.hgt", |x, y| {
            if (x, y) == (900, 300) {
                777
            } else {
                5
            }
        });

        let store = TileStore::new(temp_dir.path(), 4);
        let sampler = HeightSampler::new(&store);

        // floor(-77.25) = -78 so cx = 0.75 * 1200; cy = 0.25 * 1200.
        let p = GeoPoint::new(-77.25, -12.75);
        assert_eq!(sampler.height_at(p).unwrap(), 777);
    }

    #[test]
    fn test_voids_are_filled_before_blending() {
        let temp_dir = TempDir::new().unwrap();
        write_tile(temp_dir.path(), "N51W001.hgt", |x, y| {
            if (x, y) == (600, 600) {
                VOID_VALUE
            } else {
                250
            }
        });

        let store = TileStore::new(temp_dir.path(), 4);
        let sampler = HeightSampler::new(&store);
        assert_eq!(sampler.height_at(GeoPoint::new(-0.5, 51.5)).unwrap(), 250);
    }

    #[test]
    fn test_unavailable_tile_is_zero() {
        let temp_dir = TempDir::new().unwrap();
        let store = TileStore::new(temp_dir.path(), 4);
        let sampler = HeightSampler::new(&store);

        let p = sampler.sample(GeoPoint::new(10.5, 45.5)).unwrap();
        assert_eq!(p.height, 0);
        assert_eq!(p.quality, DataQuality::TileUnavailable);
    }

    #[test]
    fn test_out_of_coverage_is_zero_without_disk_access() {
        let temp_dir = TempDir::new().unwrap();
        let store = TileStore::builder(temp_dir.path())
            .coverage(BoundingBox::new(49.0, -11.0, 61.0, 4.0))
            .build();
        let sampler = HeightSampler::new(&store);

        let p = sampler.sample(GeoPoint::new(10.5, 45.5)).unwrap();
        assert_eq!(p, PointHeight::fallback(DataQuality::OutOfCoverage));
        assert_eq!(store.cache_stats().miss_count, 0);

        // Default coverage stops at 60°N.
        let store = TileStore::new(temp_dir.path(), 4);
        let p = HeightSampler::new(&store).sample(GeoPoint::new(25.0, 70.0)).unwrap();
        assert_eq!(p.quality, DataQuality::OutOfCoverage);
    }

    #[test]
    fn test_all_void_tile_is_exhausted() {
        let temp_dir = TempDir::new().unwrap();
        write_tile(temp_dir.path(), "N51W001.hgt", |_, _| VOID_VALUE);

        let store = TileStore::new(temp_dir.path(), 4);
        let p = HeightSampler::new(&store)
            .sample(GeoPoint::new(-0.3, 51.2))
            .unwrap();
        assert_eq!(p.height, 0);
        assert_eq!(p.quality, DataQuality::VoidExhausted);
    }

    #[test]
    fn test_corrupt_tile_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("N51W001.hgt"), [0u8; 10]).unwrap();

        let store = TileStore::new(temp_dir.path(), 4);
        assert!(HeightSampler::new(&store)
            .height_at(GeoPoint::new(-0.3, 51.2))
            .is_err());
    }

    #[test]
    fn test_quality_names() {
        assert_eq!(DataQuality::Measured.to_string(), "measured");
        assert_eq!(DataQuality::OutOfCoverage.as_str(), "out_of_coverage");
        assert!(!DataQuality::TileUnavailable.is_measured());
    }
}
