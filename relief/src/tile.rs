//! Elevation tiles: identification, loading and raw sample access.
//!
//! This module provides [`Tile`], an immutable 1° × 1° grid of big-endian
//! `i16` elevation samples, and [`TileId`], the integer cell it covers.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use memmap2::Mmap;

use crate::error::{ReliefError, Result};
use crate::filename::{tile_name, HGT_EXT};
use crate::geodesic::GeoPoint;

/// Number of samples per row/column for SRTM1
const SRTM1_SAMPLES: usize = 3601;

/// Number of samples per row/column for SRTM3
const SRTM3_SAMPLES: usize = 1201;

/// Value indicating no data (void) in SRTM files
pub const VOID_VALUE: i16 = -32768;

/// Lowest valid elevation (metres).
pub const MIN_HEIGHT: i16 = -32767;

/// Highest valid elevation (metres).
pub const MAX_HEIGHT: i16 = 32767;

/// Grid resolution of the tiles a store serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// SRTM1: 1 arc-second (~30m) resolution, 3601 × 3601 samples
    Srtm1,
    /// SRTM3: 3 arc-second (~90m) resolution, 1201 × 1201 samples
    #[default]
    Srtm3,
}

impl Resolution {
    /// Returns the number of samples per row/column for this resolution.
    pub fn samples(&self) -> usize {
        match self {
            Resolution::Srtm1 => SRTM1_SAMPLES,
            Resolution::Srtm3 => SRTM3_SAMPLES,
        }
    }

    /// Exact byte length of an uncompressed tile.
    pub fn file_size(&self) -> usize {
        self.samples() * self.samples() * 2
    }

    /// Angle between neighbouring samples, in radians.
    pub fn angular_resolution(&self) -> f64 {
        (1.0 / (self.samples() - 1) as f64).to_radians()
    }

    /// Returns the approximate resolution in meters.
    pub fn meters(&self) -> f64 {
        match self {
            Resolution::Srtm1 => 30.0,
            Resolution::Srtm3 => 90.0,
        }
    }
}

impl FromStr for Resolution {
    type Err = ReliefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srtm1" | "1" => Ok(Resolution::Srtm1),
            "srtm3" | "3" => Ok(Resolution::Srtm3),
            other => Err(ReliefError::InvalidOption(format!(
                "unknown resolution {other:?} (expected srtm1 or srtm3)"
            ))),
        }
    }
}

/// Integer latitude/longitude band identifying a 1° × 1° cell.
///
/// Both components are the `floor` of the coordinate, i.e. the southwest
/// corner of the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    /// Southwest corner latitude.
    pub lat: i32,
    /// Southwest corner longitude.
    pub lon: i32,
}

impl TileId {
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// The cell that contains `point`.
    pub fn containing(point: GeoPoint) -> Self {
        Self {
            lat: point.lat.floor() as i32,
            lon: point.lon.floor() as i32,
        }
    }

    /// Bare tile name, e.g. `N51W001`.
    pub fn name(&self) -> String {
        tile_name(self.lat, self.lon)
    }

    /// Uncompressed filename, e.g. `N51W001.hgt`.
    pub fn filename(&self) -> String {
        format!("{}{}", self.name(), HGT_EXT)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Backing bytes of a tile.
enum TileData {
    /// Memory-mapped `.hgt` file
    Mapped(Mmap),
    /// Bytes read out of an archive, or built in memory
    Owned(Vec<u8>),
}

impl TileData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            TileData::Mapped(mmap) => &mmap[..],
            TileData::Owned(bytes) => bytes.as_slice(),
        }
    }
}

/// An immutable elevation tile.
///
/// Samples are kept exactly as stored on disk (big-endian) and decoded on
/// every lookup, so the same code path serves memory-mapped files and
/// archive entries.
///
/// Two indexings are exposed:
///
/// - [`Tile::sample`]: `(row, col)` with row 0 at the **north** edge, as in
///   the file.
/// - [`Tile::raw_height`]: `(x, y)` with x counting columns from the west
///   edge and y counting rows from the **south** edge. This is what the
///   bilinear sampler and the void search use.
pub struct Tile {
    id: TileId,
    resolution: Resolution,
    data: TileData,
    /// Lazily computed on the first void lookup.
    all_void: OnceLock<bool>,
}

impl Tile {
    /// Memory-map an uncompressed `.hgt` file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or memory-mapped
    /// - The file length is not exactly `2 × cols × rows` bytes
    pub fn from_file<P: AsRef<Path>>(path: P, id: TileId, resolution: Resolution) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let size = file.metadata()?.len() as usize;
        check_size(path, size, resolution)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and don't expose the mapping.
        let mmap = unsafe { Mmap::map(&file)? };
        check_size(path, mmap.len(), resolution)?;

        Ok(Self::with_data(id, resolution, TileData::Mapped(mmap)))
    }

    /// Build a tile from raw big-endian bytes (e.g. an archive entry).
    ///
    /// `origin` is only used for error reporting.
    pub fn from_bytes(
        bytes: Vec<u8>,
        id: TileId,
        resolution: Resolution,
        origin: &Path,
    ) -> Result<Self> {
        check_size(origin, bytes.len(), resolution)?;
        Ok(Self::with_data(id, resolution, TileData::Owned(bytes)))
    }

    /// Build a tile from samples in file order (row 0 = north).
    pub fn from_samples(samples: &[i16], id: TileId, resolution: Resolution) -> Result<Self> {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_be_bytes()).collect();
        Self::from_bytes(bytes, id, resolution, Path::new(&id.filename()))
    }

    fn with_data(id: TileId, resolution: Resolution, data: TileData) -> Self {
        Self {
            id,
            resolution,
            data,
            all_void: OnceLock::new(),
        }
    }

    /// Raw sample at `(row, col)`, row 0 being the northern edge.
    ///
    /// Panics if the indices are out of range.
    #[inline]
    pub fn sample(&self, row: usize, col: usize) -> i16 {
        let offset = (row * self.cols() + col) * 2;
        let bytes = self.data.as_bytes();
        i16::from_be_bytes([bytes[offset], bytes[offset + 1]])
    }

    /// Raw sample at `(x, y)`, x from the western edge, y from the southern
    /// edge. The caller guarantees `x < cols` and `y < rows`.
    #[inline]
    pub fn raw_height(&self, x: usize, y: usize) -> i16 {
        self.sample(self.rows() - 1 - y, x)
    }

    /// Whether every sample in the tile is [`VOID_VALUE`].
    pub fn is_all_void(&self) -> bool {
        *self.all_void.get_or_init(|| {
            self.data
                .as_bytes()
                .chunks_exact(2)
                .all(|pair| i16::from_be_bytes([pair[0], pair[1]]) == VOID_VALUE)
        })
    }

    /// Returns the cell this tile covers.
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Returns the resolution of this tile.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Samples per row.
    pub fn cols(&self) -> usize {
        self.resolution.samples()
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.resolution.samples()
    }

    /// Angle between neighbouring samples, in radians.
    pub fn angular_resolution(&self) -> f64 {
        self.resolution.angular_resolution()
    }

    /// Whether the bytes come from a memory-mapped file.
    pub fn is_mapped(&self) -> bool {
        matches!(self.data, TileData::Mapped(_))
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id)
            .field("resolution", &self.resolution)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

fn check_size(path: &Path, size: usize, resolution: Resolution) -> Result<()> {
    let expected = resolution.file_size();
    if size == expected {
        Ok(())
    } else {
        Err(ReliefError::InvalidFileSize {
            path: path.to_path_buf(),
            size,
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SRTM3_SIZE: usize = SRTM3_SAMPLES * SRTM3_SAMPLES * 2;

    /// Create a test SRTM3 file with known elevation values
    fn create_test_srtm3_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = vec![0u8; SRTM3_SIZE];

        // Row 0, Col 0 (northwest corner) = 1000m
        data[0] = 0x03;
        data[1] = 0xE8;

        // Row 1200, Col 1200 (southeast corner) = 100m
        let se_offset = (1200 * SRTM3_SAMPLES + 1200) * 2;
        data[se_offset] = 0x00;
        data[se_offset + 1] = 0x64;

        // Row 1200, Col 0 (southwest corner) = -5m
        let sw_offset = 1200 * SRTM3_SAMPLES * 2;
        data[sw_offset..sw_offset + 2].copy_from_slice(&(-5i16).to_be_bytes());

        file.write_all(&data).unwrap();
        file
    }

    #[test]
    fn test_load_srtm3_file() {
        let file = create_test_srtm3_file();
        let tile = Tile::from_file(file.path(), TileId::new(51, -1), Resolution::Srtm3).unwrap();

        assert_eq!(tile.resolution(), Resolution::Srtm3);
        assert_eq!(tile.cols(), SRTM3_SAMPLES);
        assert_eq!(tile.rows(), SRTM3_SAMPLES);
        assert!(tile.is_mapped());
        assert_eq!(tile.id().to_string(), "N51W001");
    }

    #[test]
    fn test_big_endian_decoding() {
        let file = create_test_srtm3_file();
        let tile = Tile::from_file(file.path(), TileId::new(51, -1), Resolution::Srtm3).unwrap();

        assert_eq!(tile.sample(0, 0), 1000);
        assert_eq!(tile.sample(1200, 1200), 100);
        assert_eq!(tile.sample(1200, 0), -5);
    }

    #[test]
    fn test_raw_height_counts_rows_from_south() {
        let file = create_test_srtm3_file();
        let tile = Tile::from_file(file.path(), TileId::new(51, -1), Resolution::Srtm3).unwrap();

        // y = 0 is the southern edge (last row in the file)
        assert_eq!(tile.raw_height(0, 0), -5);
        assert_eq!(tile.raw_height(1200, 0), 100);
        assert_eq!(tile.raw_height(0, 1200), 1000);
    }

    #[test]
    fn test_invalid_file_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 1000]).unwrap();

        let result = Tile::from_file(file.path(), TileId::new(0, 0), Resolution::Srtm3);
        match result {
            Err(ReliefError::InvalidFileSize { size, expected, .. }) => {
                assert_eq!(size, 1000);
                assert_eq!(expected, SRTM3_SIZE);
            }
            other => panic!("Expected InvalidFileSize error, got {other:?}"),
        }
    }

    #[test]
    fn test_srtm1_file_rejected_by_srtm3_store() {
        let result = Tile::from_bytes(
            vec![0u8; Resolution::Srtm1.file_size()],
            TileId::new(0, 0),
            Resolution::Srtm3,
            Path::new("N00E000.hgt"),
        );
        assert!(matches!(result, Err(ReliefError::InvalidFileSize { .. })));
    }

    #[test]
    fn test_all_void_detection() {
        let n = SRTM3_SAMPLES * SRTM3_SAMPLES;
        let mut samples = vec![VOID_VALUE; n];
        let tile = Tile::from_samples(&samples, TileId::new(0, 0), Resolution::Srtm3).unwrap();
        assert!(tile.is_all_void());

        samples[n / 2] = 12;
        let tile = Tile::from_samples(&samples, TileId::new(0, 0), Resolution::Srtm3).unwrap();
        assert!(!tile.is_all_void());
    }

    #[test]
    fn test_resolution_info() {
        assert_eq!(Resolution::Srtm1.samples(), 3601);
        assert_eq!(Resolution::Srtm3.samples(), 1201);
        assert_eq!(Resolution::Srtm3.file_size(), 2884802);
        assert_eq!(Resolution::Srtm1.file_size(), 25934402);
        assert_eq!(Resolution::Srtm1.meters(), 30.0);
        assert_eq!(Resolution::Srtm3.meters(), 90.0);

        let three_arcsec = (3.0f64 / 3600.0).to_radians();
        assert!((Resolution::Srtm3.angular_resolution() - three_arcsec).abs() < 1e-15);
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!("srtm1".parse::<Resolution>().unwrap(), Resolution::Srtm1);
        assert_eq!(" SRTM3 ".parse::<Resolution>().unwrap(), Resolution::Srtm3);
        assert!("srtm90".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_tile_id_containing() {
        let id = TileId::containing(GeoPoint::new(-0.12, 51.5));
        assert_eq!(id, TileId::new(51, -1));
        assert_eq!(id.filename(), "N51W001.hgt");
    }
}
