use anyhow::{Context, Result};
use relief::{DataQuality, GeoPoint, HeightSampler, ReliefError};
use serde::Serialize;

use super::StoreArgs;

#[derive(Serialize)]
struct HeightOutput {
    lon: f64,
    lat: f64,
    height: i32,
    quality: &'static str,
}

pub fn run(args: StoreArgs, lon: f64, lat: f64, json: bool, strict: bool) -> Result<()> {
    let point = GeoPoint::new(lon, lat).validate()?;
    let store = args.build()?;

    let measured = HeightSampler::new(&store)
        .sample(point)
        .context("Failed to get height")?;

    tracing::debug!(point = %point, height = measured.height, quality = %measured.quality, "Height sampled");

    if strict && measured.quality == DataQuality::OutOfCoverage {
        return Err(ReliefError::OutOfCoverage { lat, lon }.into());
    }

    if json {
        let output = HeightOutput {
            lon,
            lat,
            height: measured.height,
            quality: measured.quality.as_str(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if measured.quality == DataQuality::Measured {
        println!("{}", measured.height);
    } else {
        println!("{} ({})", measured.height, measured.quality);
    }

    Ok(())
}
