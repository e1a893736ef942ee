use anyhow::Result;
use clap::{Parser, Subcommand};
use relief::{GeoPoint, Resolution};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{parse_point, StoreArgs};

/// SRTM heights and terrain profiles
#[derive(Parser)]
#[command(name = "relief")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing .hgt / .hgt.zip files
    #[arg(short, long, env = "RELIEF_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum tiles in cache
    #[arg(
        short,
        long,
        env = "RELIEF_CACHE_SIZE",
        default_value = "16",
        global = true
    )]
    cache_size: u64,

    /// Tile resolution: srtm3 or srtm1
    #[arg(
        short,
        long,
        env = "RELIEF_RESOLUTION",
        default_value = "srtm3",
        global = true
    )]
    resolution: Resolution,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Height at a single coordinate
    Height {
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,

        /// Fail instead of printing 0 for points outside the coverage area
        #[arg(long)]
        strict: bool,
    },

    /// Terrain profile between two coordinates
    Profile {
        /// Start point as LON,LAT
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        from: GeoPoint,

        /// End point as LON,LAT
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        to: GeoPoint,

        /// Add the earth's curvature to the heights
        #[arg(long)]
        curvature: bool,

        /// Report the highest sample of each point instead of the mean
        #[arg(long)]
        max: bool,

        /// Maximum number of points to output
        #[arg(short, long, default_value = "100")]
        points: usize,

        /// Output result as JSON
        #[arg(short, long, conflicts_with = "geojson")]
        json: bool,

        /// Output result as a GeoJSON LineString feature
        #[arg(short, long)]
        geojson: bool,
    },

    /// Display information about an SRTM tile
    Info {
        /// Path to a .hgt / .hgt.zip file, or tile name (e.g., N51W001)
        tile: Option<String>,

        /// Specify tile by latitude instead of name
        #[arg(long, conflicts_with = "tile", requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Specify tile by longitude instead of name
        #[arg(long, conflicts_with = "tile", requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// List available SRTM tiles
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RELIEF_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = StoreArgs {
        data_dir: cli.data_dir,
        cache_size: cli.cache_size,
        resolution: cli.resolution,
    };

    match cli.command {
        Commands::Height {
            lon,
            lat,
            json,
            strict,
        } => commands::height::run(store, lon, lat, json, strict),
        Commands::Profile {
            from,
            to,
            curvature,
            max,
            points,
            json,
            geojson,
        } => commands::profile::run(
            store,
            from,
            to,
            curvature,
            max,
            points,
            commands::profile::Format::from_flags(json, geojson),
        ),
        Commands::Info { tile, lat, lon } => commands::info::run(store, tile, lat, lon),
        Commands::List => commands::list::run(store),
    }
}
