//! Tile store with LRU caching.
//!
//! This module provides [`TileStore`], which finds, loads and caches the
//! tiles behind every height lookup. A store is an ordinary value: create one
//! per process (or per request) and pass it around, or share it behind an
//! `Arc`. The cache is internally synchronized, so a shared store is safe to
//! use from concurrent requests.
//!
//! # Lookup order
//!
//! For tile `N51W001` in data directory `dir`:
//!
//! 1. `dir/N51W001.hgt`, memory-mapped
//! 2. entry `N51W001.hgt` in `dir/N51W001.hgt.zip`
//! 3. entry `N51W001.hgt` in `dir/N51W001.SRTMGL1.hgt.zip`
//!
//! If none exist the tile is *unavailable*. That is remembered in the cache
//! like a loaded tile, and every sample of it reads as void.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use moka::sync::Cache;
use zip::ZipArchive;

use crate::error::{ReliefError, Result};
use crate::filename::{archive_names, filename_to_lat_lon, HGT_EXT};
use crate::geodesic::GeoPoint;
use crate::tile::{Resolution, Tile, TileId, VOID_VALUE};

/// Default number of tiles kept in memory.
pub const DEFAULT_CACHE_SIZE: u64 = 16;

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of tiles (loaded or unavailable) currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (requests served from cache).
    pub hit_count: u64,
    /// Number of cache misses (tiles looked up on disk).
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// A geographic bounding box, in decimal degrees (WGS84).
///
/// Used as the coverage area of a store: queries outside it never touch the
/// disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum latitude (southern boundary).
    pub min_lat: f64,
    /// Minimum longitude (western boundary).
    pub min_lon: f64,
    /// Maximum latitude (northern boundary).
    pub max_lat: f64,
    /// Maximum longitude (eastern boundary).
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Whether `point` lies inside the box (edges included).
    ///
    /// `NaN` coordinates are never contained.
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    /// Check if this bounding box overlaps with a 1°×1° tile.
    ///
    /// A tile at `(tile_lat, tile_lon)` covers the area
    /// `[tile_lat, tile_lat+1) × [tile_lon, tile_lon+1)`.
    pub fn overlaps_tile(&self, id: TileId) -> bool {
        let tile_max_lat = id.lat + 1;
        let tile_max_lon = id.lon + 1;

        self.min_lat < tile_max_lat as f64
            && self.max_lat > id.lat as f64
            && self.min_lon < tile_max_lon as f64
            && self.max_lon > id.lon as f64
    }
}

impl Default for BoundingBox {
    /// SRTM coverage: latitudes ±60°, all longitudes.
    fn default() -> Self {
        Self::new(-60.0, -180.0, 60.0, 180.0)
    }
}

impl FromStr for BoundingBox {
    type Err = ReliefError;

    /// Parse `min_lat,min_lon,max_lat,max_lon`.
    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ReliefError::InvalidOption(format!("bounding box {s:?}: {e}")))?;

        match parts[..] {
            [min_lat, min_lon, max_lat, max_lon] if min_lat <= max_lat && min_lon <= max_lon => {
                Ok(Self::new(min_lat, min_lon, max_lat, max_lon))
            }
            _ => Err(ReliefError::InvalidOption(format!(
                "bounding box {s:?}: expected min_lat,min_lon,max_lat,max_lon"
            ))),
        }
    }
}

/// Result of one attempt to read a tile from storage.
enum Fetched {
    Loaded(Tile),
    Missing,
    TimedOut,
}

/// Loads and caches elevation tiles from a data directory.
///
/// # Example
///
/// ```ignore
/// use relief::{TileStore, TileId};
///
/// let store = TileStore::new("/data/srtm", 16);
///
/// match store.load(TileId::new(51, -1))? {
///     Some(tile) => println!("{} is {}×{}", tile.id(), tile.cols(), tile.rows()),
///     None => println!("not on disk"),
/// }
/// ```
pub struct TileStore {
    /// Directory containing .hgt and .hgt.zip files.
    data_dir: PathBuf,
    /// Resolution every tile must have.
    resolution: Resolution,
    /// Area outside which lookups are refused.
    coverage: BoundingBox,
    /// Deadline for reading a single tile.
    load_timeout: Option<Duration>,
    /// LRU cache keyed by tile; `None` marks an unavailable tile.
    tile_cache: Cache<TileId, Option<Arc<Tile>>>,
    /// Number of cache hits.
    hit_count: AtomicU64,
    /// Number of cache misses.
    miss_count: AtomicU64,
    /// Tiles whose deadline-bounded read is still running.
    in_flight: Arc<Mutex<HashSet<TileId>>>,
}

impl TileStore {
    /// Create a store with SRTM3 tiles, default coverage and no deadline.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Directory containing `.hgt` / `.hgt.zip` files
    /// * `cache_size` - Maximum number of tiles to keep in memory
    pub fn new<P: AsRef<Path>>(data_dir: P, cache_size: u64) -> Self {
        TileStoreBuilder::new(data_dir).cache_size(cache_size).build()
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> TileStoreBuilder {
        TileStoreBuilder::new(data_dir)
    }

    /// Load a tile from the cache or from storage.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(tile))` - the tile is resident
    /// - `Ok(None)` - neither the file nor an archive entry exists, or the
    ///   read missed its deadline
    /// - `Err(...)` - the data exists but is corrupt (wrong length, bad zip)
    pub fn load(&self, id: TileId) -> Result<Option<Arc<Tile>>> {
        if let Some(entry) = self.tile_cache.get(&id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(entry);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);

        let fetched = match self.load_timeout {
            Some(timeout) => self.fetch_with_deadline(id, timeout)?,
            None => fetch(&self.data_dir, id, self.resolution)?,
        };

        match fetched {
            Fetched::Loaded(tile) => {
                tracing::debug!(tile = %id, mapped = tile.is_mapped(), "Loaded tile");
                let tile = Arc::new(tile);
                self.tile_cache.insert(id, Some(tile.clone()));
                Ok(Some(tile))
            }
            Fetched::Missing => {
                tracing::debug!(tile = %id, dir = %self.data_dir.display(), "Tile unavailable");
                self.tile_cache.insert(id, None);
                Ok(None)
            }
            // Not cached: the next lookup gets another chance.
            Fetched::TimedOut => Ok(None),
        }
    }

    /// Raw sample of a tile, x from the west edge and y from the south edge.
    ///
    /// Returns [`VOID_VALUE`] for an unavailable tile. The caller guarantees
    /// the indices are in bounds.
    pub fn raw_height(&self, id: TileId, x: usize, y: usize) -> Result<i16> {
        Ok(match self.load(id)? {
            Some(tile) => tile.raw_height(x, y),
            None => VOID_VALUE,
        })
    }

    /// Whether `point` is inside the store's coverage box.
    pub fn covers(&self, point: GeoPoint) -> bool {
        self.coverage.contains(point)
    }

    /// Read a tile on a loader thread, waiting at most `timeout`.
    ///
    /// At most one loader runs per tile. While it is stuck, further lookups
    /// of that tile report it unavailable at once. A tile that arrives after
    /// its deadline is still cached for later lookups.
    fn fetch_with_deadline(&self, id: TileId, timeout: Duration) -> Result<Fetched> {
        if !lock(&self.in_flight).insert(id) {
            tracing::debug!(tile = %id, "Tile load still in flight, treating as unavailable");
            return Ok(Fetched::TimedOut);
        }

        let (tx, rx) = mpsc::channel();
        let data_dir = self.data_dir.clone();
        let resolution = self.resolution;
        let tile_cache = self.tile_cache.clone();
        let in_flight = Arc::clone(&self.in_flight);

        thread::spawn(move || {
            let result = fetch(&data_dir, id, resolution);
            if let Err(mpsc::SendError(late)) = tx.send(result) {
                match late {
                    Ok(Fetched::Loaded(tile)) => {
                        tracing::debug!(tile = %id, "Late tile load cached");
                        tile_cache.insert(id, Some(Arc::new(tile)));
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(tile = %id, error = %e, "Late tile load failed"),
                }
            }
            lock(&in_flight).remove(&id);
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    tile = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Tile load missed its deadline, treating as unavailable"
                );
                Ok(Fetched::TimedOut)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!(tile = %id, "Tile loader thread died");
                lock(&self.in_flight).remove(&id);
                Ok(Fetched::TimedOut)
            }
        }
    }

    /// Number of tile reads still running past their deadline.
    pub fn loads_in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.tile_cache.run_pending_tasks();
        CacheStats {
            entry_count: self.tile_cache.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolution of the tiles this store serves.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Coverage box of this store.
    pub fn coverage(&self) -> BoundingBox {
        self.coverage
    }

    /// Per-tile read deadline, if any.
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout
    }

    /// Get the maximum cache size.
    pub fn cache_capacity(&self) -> u64 {
        self.tile_cache.policy().max_capacity().unwrap_or(0)
    }

    /// Drop one tile (or its "unavailable" marker) from the cache.
    ///
    /// Useful after a tile file was added or replaced on disk.
    pub fn invalidate(&self, id: TileId) {
        self.tile_cache.invalidate(&id);
    }

    /// Clear all tiles from the cache.
    pub fn clear_cache(&self) {
        self.tile_cache.invalidate_all();
    }

    /// Scan the data directory for `.hgt` files and tile archives.
    ///
    /// Returns the sorted, deduplicated set of tiles present in any form.
    pub fn scan_tiles(&self) -> Vec<TileId> {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let tiles: BTreeSet<TileId> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.ends_with(HGT_EXT) || name.ends_with(".hgt.zip") {
                    filename_to_lat_lon(&name).map(|(lat, lon)| TileId::new(lat, lon))
                } else {
                    None
                }
            })
            .collect();

        tiles.into_iter().collect()
    }
}

impl fmt::Debug for TileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileStore")
            .field("data_dir", &self.data_dir)
            .field("resolution", &self.resolution)
            .field("coverage", &self.coverage)
            .field("load_timeout", &self.load_timeout)
            .field("cache_capacity", &self.cache_capacity())
            .finish()
    }
}

/// Read a tile from the raw file, falling back to its archives.
fn fetch(data_dir: &Path, id: TileId, resolution: Resolution) -> Result<Fetched> {
    let filename = id.filename();
    let path = data_dir.join(&filename);

    match Tile::from_file(&path, id, resolution) {
        Ok(tile) => return Ok(Fetched::Loaded(tile)),
        Err(ReliefError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
        Err(ReliefError::Io(e)) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read tile file, trying archives");
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Corrupt tile file");
            return Err(e);
        }
    }

    for archive in archive_names(&id.name()) {
        let zip_path = data_dir.join(archive);
        if let Some(bytes) = read_archive_entry(&zip_path, &filename)? {
            return Tile::from_bytes(bytes, id, resolution, &zip_path).map(Fetched::Loaded);
        }
    }

    Ok(Fetched::Missing)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read the tile entry out of a zip archive.
///
/// Prefers the entry named `filename`; an archive whose only `.hgt` entry has
/// another name is accepted too. Returns `Ok(None)` if the archive or the
/// entry does not exist.
fn read_archive_entry(zip_path: &Path, filename: &str) -> Result<Option<Vec<u8>>> {
    let file = match File::open(zip_path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            tracing::warn!(path = %zip_path.display(), error = %e, "Cannot open tile archive");
            return Ok(None);
        }
    };

    let archive_error = |e: zip::result::ZipError| ReliefError::Archive {
        path: zip_path.to_path_buf(),
        message: e.to_string(),
    };

    let mut archive = ZipArchive::new(file).map_err(archive_error)?;

    let entry_name = if archive.file_names().any(|n| n == filename) {
        filename.to_string()
    } else {
        let mut hgt_entries = archive.file_names().filter(|n| n.ends_with(HGT_EXT));
        match (hgt_entries.next(), hgt_entries.next()) {
            (Some(only), None) => only.to_string(),
            _ => {
                tracing::warn!(path = %zip_path.display(), entry = filename, "Archive has no matching tile entry");
                return Ok(None);
            }
        }
    };

    let mut entry = archive.by_name(&entry_name).map_err(archive_error)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;

    tracing::debug!(path = %zip_path.display(), entry = %entry_name, bytes = bytes.len(), "Read tile from archive");
    Ok(Some(bytes))
}

/// Builder for creating a [`TileStore`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use relief::{BoundingBox, Resolution, TileStoreBuilder};
///
/// let store = TileStoreBuilder::new("/data/srtm")
///     .cache_size(32)
///     .resolution(Resolution::Srtm1)
///     .coverage(BoundingBox::new(49.0, -11.0, 61.0, 4.0))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TileStoreBuilder {
    data_dir: PathBuf,
    cache_size: u64,
    resolution: Resolution,
    coverage: BoundingBox,
    load_timeout: Option<Duration>,
}

impl TileStoreBuilder {
    /// Create a new builder with the specified data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            cache_size: DEFAULT_CACHE_SIZE,
            resolution: Resolution::default(),
            coverage: BoundingBox::default(),
            load_timeout: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `RELIEF_DATA_DIR` | Directory containing tiles | Required |
    /// | `RELIEF_CACHE_SIZE` | Maximum tiles in cache | 16 |
    /// | `RELIEF_RESOLUTION` | `srtm3` or `srtm1` | `srtm3` |
    /// | `RELIEF_COVERAGE` | `min_lat,min_lon,max_lat,max_lon` | `-60,-180,60,180` |
    /// | `RELIEF_LOAD_TIMEOUT_MS` | Per-tile read deadline | none |
    ///
    /// # Errors
    ///
    /// Returns an error if `RELIEF_DATA_DIR` is not set, or if
    /// `RELIEF_RESOLUTION` / `RELIEF_COVERAGE` cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("RELIEF_DATA_DIR").map_err(|_| {
            ReliefError::InvalidOption("RELIEF_DATA_DIR environment variable not set".into())
        })?;

        let mut builder = Self::new(data_dir);

        if let Some(size) = std::env::var("RELIEF_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            builder.cache_size = size;
        }

        if let Ok(resolution) = std::env::var("RELIEF_RESOLUTION") {
            builder.resolution = resolution.parse()?;
        }

        if let Ok(coverage) = std::env::var("RELIEF_COVERAGE") {
            builder.coverage = coverage.parse()?;
        }

        builder.load_timeout = std::env::var("RELIEF_LOAD_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis);

        Ok(builder)
    }

    /// Set the data directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the maximum number of tiles to keep in cache.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    /// Set the tile resolution. Files of any other size are rejected.
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Restrict lookups to a bounding box.
    pub fn coverage(mut self, coverage: BoundingBox) -> Self {
        self.coverage = coverage;
        self
    }

    /// Give up on a tile read after `timeout` and treat the tile as
    /// unavailable for that lookup.
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Build the [`TileStore`].
    pub fn build(self) -> TileStore {
        TileStore {
            data_dir: self.data_dir,
            resolution: self.resolution,
            coverage: self.coverage,
            load_timeout: self.load_timeout,
            tile_cache: Cache::builder().max_capacity(self.cache_size).build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}
