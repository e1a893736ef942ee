use anyhow::{Context, Result};
use relief::{geojson::profile_to_feature, GeoPoint, Profile, ProfileEngine, ProfileOptions, Reducer};
use serde::Serialize;

use super::StoreArgs;

/// How to print the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Json,
    GeoJson,
}

impl Format {
    pub fn from_flags(json: bool, geojson: bool) -> Self {
        match (json, geojson) {
            (_, true) => Format::GeoJson,
            (true, false) => Format::Json,
            _ => Format::Table,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileOutput {
    dist: f64,
    surface: f64,
    ascent: f64,
    level: f64,
    descent: f64,
    min: i32,
    max: i32,
    average: i32,
    min_gr: f64,
    max_gr: f64,
    ave_gr: f64,
    steps: usize,
    point_count: usize,
    quality: &'static str,
    points: Vec<PointOutput>,
}

#[derive(Serialize)]
struct PointOutput {
    lon: f64,
    lat: f64,
    height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    curvature: Option<i32>,
}

impl From<&Profile> for ProfileOutput {
    fn from(profile: &Profile) -> Self {
        let s = &profile.summary;
        Self {
            dist: s.horizontal_distance_km,
            surface: s.surface_distance_km,
            ascent: s.ascent_km,
            level: s.level_km,
            descent: s.descent_km,
            min: s.min_elevation,
            max: s.max_elevation,
            average: s.average_elevation,
            min_gr: s.min_gradient,
            max_gr: s.max_gradient,
            ave_gr: s.average_gradient,
            steps: s.steps,
            point_count: s.point_count,
            quality: s.quality.overall().as_str(),
            points: profile
                .points
                .iter()
                .map(|p| PointOutput {
                    lon: p.lon,
                    lat: p.lat,
                    height: p.height,
                    curvature: p.curvature_height,
                })
                .collect(),
        }
    }
}

pub fn run(
    args: StoreArgs,
    from: GeoPoint,
    to: GeoPoint,
    curvature: bool,
    max: bool,
    points: usize,
    format: Format,
) -> Result<()> {
    let store = args.build()?;
    let options = ProfileOptions {
        include_curvature: curvature,
        max_points: points,
        reducer: if max { Reducer::Max } else { Reducer::Average },
    };

    let profile = ProfileEngine::new(&store)
        .compute(from, to, &options)
        .context("Failed to compute profile")?;

    tracing::info!(
        from = %from,
        to = %to,
        dist_km = profile.summary.horizontal_distance_km,
        points = profile.summary.point_count,
        quality = %profile.summary.quality.overall(),
        "Profile computed"
    );

    match format {
        Format::Json => println!("{}", serde_json::to_string(&ProfileOutput::from(&profile))?),
        Format::GeoJson => println!("{}", profile_to_feature(&profile)),
        Format::Table => print_table(&profile),
    }

    Ok(())
}

fn print_table(profile: &Profile) {
    let s = &profile.summary;

    println!("Distance: {:.3} km (surface {:.3} km)", s.horizontal_distance_km, s.surface_distance_km);
    println!(
        "Ascent: {:.3} km  Level: {:.3} km  Descent: {:.3} km",
        s.ascent_km, s.level_km, s.descent_km
    );
    println!(
        "Height: min {}m  max {}m  average {}m",
        s.min_elevation, s.max_elevation, s.average_elevation
    );
    println!(
        "Gradient: min {:.3}  max {:.3}  average {:.3}",
        s.min_gradient, s.max_gradient, s.average_gradient
    );
    println!("Steps: {}  Points: {}  Quality: {}", s.steps, s.point_count, s.quality.overall());
    println!();

    let with_curvature = profile.points.iter().any(|p| p.curvature_height.is_some());
    if with_curvature {
        println!("{:>12} {:>11} {:>8} {:>9}", "LON", "LAT", "HEIGHT", "CURVE");
    } else {
        println!("{:>12} {:>11} {:>8}", "LON", "LAT", "HEIGHT");
    }
    for p in &profile.points {
        match p.curvature_height {
            Some(c) => println!("{:>12.6} {:>11.6} {:>8} {:>9}", p.lon, p.lat, p.height, c),
            None => println!("{:>12.6} {:>11.6} {:>8}", p.lon, p.lat, p.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(Format::from_flags(false, false), Format::Table);
        assert_eq!(Format::from_flags(true, false), Format::Json);
        assert_eq!(Format::from_flags(false, true), Format::GeoJson);
    }
}
