use anyhow::{bail, Context, Result};
use relief::{filename::filename_to_lat_lon, GeoPoint, Resolution, TileId, VOID_VALUE};
use std::path::{Path, PathBuf};

use super::{format_coverage, StoreArgs};

pub fn run(
    args: StoreArgs,
    tile: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> Result<()> {
    // Work out which cell, and which directory to read it from
    let (id, dir) = match (tile, lat, lon) {
        (_, Some(lat), Some(lon)) => (
            TileId::containing(GeoPoint::new(lon, lat).validate()?),
            args.data_dir()?,
        ),
        (Some(tile), _, _) => {
            let (lat, lon) = filename_to_lat_lon(&tile)
                .with_context(|| format!("Not a tile name: {tile}"))?;
            let path = Path::new(&tile);
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ if path.is_file() => PathBuf::from("."),
                _ => args.data_dir()?,
            };
            (TileId::new(lat, lon), dir)
        }
        _ => bail!("Give a tile name or --lat and --lon"),
    };

    let store = StoreArgs {
        data_dir: Some(dir),
        cache_size: 1,
        resolution: args.resolution,
    }
    .build()?;

    let tile = match store.load(id).context("Failed to load tile")? {
        Some(tile) => tile,
        None => bail!("Tile not found: {} in {}", id.name(), store.data_dir().display()),
    };

    let (mut min_height, mut max_height) = (i16::MAX, i16::MIN);
    let mut void_count = 0u64;
    for row in 0..tile.rows() {
        for col in 0..tile.cols() {
            match tile.sample(row, col) {
                VOID_VALUE => void_count += 1,
                h => {
                    min_height = min_height.min(h);
                    max_height = max_height.max(h);
                }
            }
        }
    }

    let resolution_str = match tile.resolution() {
        Resolution::Srtm1 => "SRTM1 (~30m)",
        Resolution::Srtm3 => "SRTM3 (~90m)",
    };

    println!("Tile: {}", id.name());
    println!("Directory: {}", store.data_dir().display());
    println!(
        "Storage: {}",
        if tile.is_mapped() {
            "memory-mapped .hgt"
        } else {
            "zip archive"
        }
    );
    println!();
    println!(
        "Resolution: {} ({}x{} samples)",
        resolution_str,
        tile.cols(),
        tile.rows()
    );
    println!("Coverage: {}", format_coverage(id.lat, id.lon));
    println!();

    if min_height <= max_height {
        println!("Min height: {}m", min_height);
        println!("Max height: {}m", max_height);
    } else {
        println!("No valid samples");
    }

    let total_samples = (tile.rows() * tile.cols()) as u64;
    if void_count > 0 {
        let void_pct = (void_count as f64 / total_samples as f64) * 100.0;
        println!("Void samples: {} ({:.1}%)", void_count, void_pct);
    }

    Ok(())
}
