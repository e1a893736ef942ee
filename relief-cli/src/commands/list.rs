use anyhow::Result;
use relief::{filename::archive_names, Resolution};

use super::{format_coverage, format_size, StoreArgs};

pub fn run(args: StoreArgs) -> Result<()> {
    let store = args.build()?;
    let dir = store.data_dir();
    let tiles = store.scan_tiles();

    if tiles.is_empty() {
        println!("No .hgt or .hgt.zip files found in: {}", dir.display());
        return Ok(());
    }

    let mut counts = [0usize; 3];
    let mut total_size: u64 = 0;
    let coverage = store.coverage();

    println!("{:<12} {:>8} {:>8} {:>28}", "TILE", "TYPE", "FORMAT", "COVERAGE");
    println!("{}", "-".repeat(59));

    for id in &tiles {
        // The raw file wins over archives, as in the store.
        let raw = dir.join(id.filename());
        let (path, format) = match std::fs::metadata(&raw) {
            Ok(_) => (raw, "hgt"),
            Err(_) => {
                let zipped = archive_names(&id.name())
                    .into_iter()
                    .map(|name| dir.join(name))
                    .find(|p| p.exists())
                    .unwrap_or(raw);
                (zipped, "zip")
            }
        };
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        total_size += size;

        let kind = if format == "zip" {
            counts[2] += 1;
            "-"
        } else if size == Resolution::Srtm1.file_size() as u64 {
            counts[0] += 1;
            "SRTM1"
        } else if size == Resolution::Srtm3.file_size() as u64 {
            counts[1] += 1;
            "SRTM3"
        } else {
            "???"
        };

        let mut extent = format_coverage(id.lat, id.lon);
        if !coverage.overlaps_tile(*id) {
            extent.push_str(" (outside)");
        }

        println!("{:<12} {:>8} {:>8} {:>28}", id.name(), kind, format, extent);
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Total tiles: {}", tiles.len());
    if counts[0] > 0 {
        println!("  SRTM1 (30m): {}", counts[0]);
    }
    if counts[1] > 0 {
        println!("  SRTM3 (90m): {}", counts[1]);
    }
    if counts[2] > 0 {
        println!("  Zipped: {}", counts[2]);
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", dir.display());

    Ok(())
}
