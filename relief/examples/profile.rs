//! Heights and a terrain profile across the Scottish Highlands.
//!
//! Run with: cargo run --example profile -- /path/to/hgt/files

use relief::{
    DataQuality, GeoPoint, HeightSampler, ProfileEngine, ProfileOptions, ReliefError, TileStore,
};
use std::env;

fn main() -> Result<(), ReliefError> {
    let data_dir = env::args()
        .nth(1)
        .or_else(|| env::var("RELIEF_DATA_DIR").ok())
        .unwrap_or_else(|| {
            eprintln!("Usage: cargo run --example profile -- /path/to/hgt/files");
            std::process::exit(1);
        });

    let store = TileStore::new(&data_dir, 10);
    let sampler = HeightSampler::new(&store);

    let ben_nevis = GeoPoint::new(-5.0037, 56.7969);
    let cairn_gorm = GeoPoint::new(-3.6436, 57.1167);

    println!("Point heights:");
    println!("{:-<50}", "");
    for (name, point) in [("Ben Nevis", ben_nevis), ("Cairn Gorm", cairn_gorm)] {
        let measured = sampler.sample(point)?;
        match measured.quality {
            DataQuality::Measured => println!("{}: {}m", name, measured.height),
            quality => println!("{}: no height ({})", name, quality),
        }
    }

    let options = ProfileOptions {
        include_curvature: true,
        max_points: 20,
        ..ProfileOptions::default()
    };
    let profile = ProfileEngine::new(&store).compute(ben_nevis, cairn_gorm, &options)?;
    let s = &profile.summary;

    println!("\nProfile {} -> {}:", ben_nevis, cairn_gorm);
    println!("{:-<50}", "");
    println!("  Distance: {:.2} km ({:.2} km over the surface)", s.horizontal_distance_km, s.surface_distance_km);
    println!("  Ascent / level / descent: {:.2} / {:.2} / {:.2} km", s.ascent_km, s.level_km, s.descent_km);
    println!("  Height: min {}m, max {}m, mean {}m", s.min_elevation, s.max_elevation, s.average_elevation);
    println!("  Overall quality: {}", s.quality.overall());

    println!("\n{:>10} {:>10} {:>8} {:>10}", "lon", "lat", "height", "curvature");
    for p in &profile.points {
        println!(
            "{:>10.4} {:>10.4} {:>8} {:>10}",
            p.lon,
            p.lat,
            p.height,
            p.curvature_height.unwrap_or(p.height)
        );
    }

    let stats = store.cache_stats();
    println!("\nCache: {} tiles, {:.1}% hit rate", stats.entry_count, stats.hit_rate() * 100.0);

    Ok(())
}
