pub mod height;
pub mod info;
pub mod list;
pub mod profile;

use anyhow::{bail, Context, Result};
use relief::{GeoPoint, Resolution, TileStore, TileStoreBuilder};
use std::path::PathBuf;

/// Global options shared by every command.
pub struct StoreArgs {
    pub data_dir: Option<PathBuf>,
    pub cache_size: u64,
    pub resolution: Resolution,
}

impl StoreArgs {
    /// The data directory, from `--data-dir` or `RELIEF_DATA_DIR`.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let dir = std::env::var("RELIEF_DATA_DIR").context(
                    "RELIEF_DATA_DIR environment variable not set. Use --data-dir or set RELIEF_DATA_DIR",
                )?;
                Ok(PathBuf::from(dir))
            }
        }
    }

    /// Build a tile store, honouring the coverage and deadline variables.
    pub fn build(&self) -> Result<TileStore> {
        let dir = self.data_dir()?;
        if !dir.is_dir() {
            bail!("Data directory does not exist: {}", dir.display());
        }

        let mut builder = TileStoreBuilder::new(&dir)
            .cache_size(self.cache_size)
            .resolution(self.resolution);

        if let Ok(coverage) = std::env::var("RELIEF_COVERAGE") {
            builder = builder.coverage(coverage.parse().context("Invalid RELIEF_COVERAGE")?);
        }
        if let Some(ms) = std::env::var("RELIEF_LOAD_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            builder = builder.load_timeout(std::time::Duration::from_millis(ms));
        }

        let store = builder.build();
        tracing::debug!(store = ?store, "Opened tile store");
        Ok(store)
    }
}

/// Parse `LON,LAT` into a point.
pub fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let (lon, lat) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LON,LAT, got {s:?}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude {lon:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude {lat:?}"))?;
    GeoPoint::new(lon, lat)
        .validate()
        .map_err(|e| e.to_string())
}

/// Human-readable extent of the cell with southwest corner `(lat, lon)`.
pub fn format_coverage(lat: i32, lon: i32) -> String {
    let lat_prefix = |v: i32| if v >= 0 { "N" } else { "S" };
    let lon_prefix = |v: i32| if v >= 0 { "E" } else { "W" };
    format!(
        "{}{:02} to {}{:02}, {}{:03} to {}{:03}",
        lat_prefix(lat),
        lat.abs(),
        lat_prefix(lat + 1),
        (lat + 1).abs(),
        lon_prefix(lon),
        lon.abs(),
        lon_prefix(lon + 1),
        (lon + 1).abs()
    )
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("-5.0037,56.7969"), Ok(GeoPoint::new(-5.0037, 56.7969)));
        assert_eq!(parse_point(" 138.5 , 35.25 "), Ok(GeoPoint::new(138.5, 35.25)));
        assert!(parse_point("138.5").is_err());
        assert!(parse_point("east,35").is_err());
        assert!(parse_point("0,95").is_err());
    }

    #[test]
    fn test_format_coverage() {
        assert_eq!(format_coverage(51, -1), "N51 to N52, W001 to E000");
        assert_eq!(format_coverage(-13, -78), "S13 to S12, W078 to W077");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2_884_802), "2.75 MB");
    }

    fn write_flat_tile(dir: &std::path::Path, name: &str, height: i16) {
        let data: Vec<u8> = std::iter::repeat(height.to_be_bytes())
            .take(1201 * 1201)
            .flatten()
            .collect();
        std::fs::write(dir.join(name), data).unwrap();
    }

    fn store_args(dir: &std::path::Path) -> StoreArgs {
        StoreArgs {
            data_dir: Some(dir.to_path_buf()),
            cache_size: 4,
            resolution: Resolution::Srtm3,
        }
    }

    #[test]
    fn test_store_args_build() {
        let temp_dir = TempDir::new().unwrap();
        write_flat_tile(temp_dir.path(), "N51W001.hgt", 250);

        let store = store_args(temp_dir.path()).build().unwrap();
        assert_eq!(store.data_dir(), temp_dir.path());
        assert_eq!(store.cache_capacity(), 4);
        assert_eq!(store.scan_tiles(), vec![relief::TileId::new(51, -1)]);
    }

    #[test]
    fn test_commands_against_temp_tiles() {
        let temp_dir = TempDir::new().unwrap();
        write_flat_tile(temp_dir.path(), "N51W001.hgt", 250);
        let dir = temp_dir.path();

        list::run(store_args(dir)).unwrap();
        info::run(store_args(dir), Some("N51W001".to_string()), None, None).unwrap();
        info::run(store_args(dir), None, Some(51.5), Some(-0.5)).unwrap();
        assert!(info::run(store_args(dir), Some("N10E010".to_string()), None, None).is_err());
        height::run(store_args(dir), -0.5, 51.5, true, false).unwrap();
        assert!(height::run(store_args(dir), 0.5, 75.0, false, true).is_err());
        profile::run(
            store_args(dir),
            GeoPoint::new(-0.9, 51.1),
            GeoPoint::new(-0.8, 51.2),
            true,
            false,
            10,
            profile::Format::Json,
        )
        .unwrap();
    }

    #[test]
    fn test_store_args_missing_dir() {
        let args = StoreArgs {
            data_dir: Some(PathBuf::from("/nonexistent/relief/tiles")),
            cache_size: 4,
            resolution: Resolution::Srtm3,
        };
        assert!(args.build().is_err());
    }
}
