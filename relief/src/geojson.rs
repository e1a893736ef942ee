//! GeoJSON output for profiles.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use relief::geojson::profile_to_feature;
//!
//! let profile = engine.compute(from, to, &ProfileOptions::default())?;
//! let feature = profile_to_feature(&profile);
//! // {"type": "Feature", "geometry": {"type": "LineString",
//! //   "coordinates": [[-5.0, 56.8, 1012.0], ...]}, "properties": {"dist": 12.3, ...}}
//! println!("{}", feature);
//! ```

use geojson::{Feature, Geometry, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::profile::Profile;

/// Convert a profile into a `LineString` feature.
///
/// Every downsampled point becomes a `[lon, lat, height]` position, with the
/// bucket height as Z. The summary goes into the properties under the same
/// names the HTTP service uses (`dist`, `surface`, `ascent`, ...).
pub fn profile_to_feature(profile: &Profile) -> Feature {
    let coordinates: Vec<Vec<f64>> = profile
        .points
        .iter()
        .map(|p| vec![p.lon, p.lat, f64::from(p.height)])
        .collect();

    let s = &profile.summary;
    let mut properties = JsonObject::new();
    let mut set = |key: &str, value: JsonValue| {
        properties.insert(key.to_string(), value);
    };
    set("dist", s.horizontal_distance_km.into());
    set("surface", s.surface_distance_km.into());
    set("ascent", s.ascent_km.into());
    set("level", s.level_km.into());
    set("descent", s.descent_km.into());
    set("min", s.min_elevation.into());
    set("max", s.max_elevation.into());
    set("average", s.average_elevation.into());
    set("minGr", s.min_gradient.into());
    set("maxGr", s.max_gradient.into());
    set("aveGr", s.average_gradient.into());
    set("steps", s.steps.into());
    set("pointCount", s.point_count.into());
    set("quality", s.quality.overall().as_str().into());

    if profile.points.iter().any(|p| p.curvature_height.is_some()) {
        let curvature: Vec<JsonValue> = profile
            .points
            .iter()
            .map(|p| p.curvature_height.into())
            .collect();
        set("curvature", JsonValue::Array(curvature));
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::LineString(coordinates))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{DownsampledPoint, ProfileSummary, QualityTally};

    fn sample_profile(curvature: bool) -> Profile {
        let points = vec![
            DownsampledPoint {
                lon: -5.0,
                lat: 56.8,
                curvature_height: curvature.then_some(0),
                height: 1012,
            },
            DownsampledPoint {
                lon: -4.95,
                lat: 56.75,
                curvature_height: curvature.then_some(3),
                height: 640,
            },
        ];
        Profile {
            summary: ProfileSummary {
                horizontal_distance_km: 6.502,
                surface_distance_km: 6.531,
                ascent_km: 1.2,
                level_km: 0.0,
                descent_km: 5.331,
                min_elevation: 633,
                max_elevation: 1013,
                average_elevation: 801,
                min_gradient: -0.41,
                max_gradient: 0.2,
                average_gradient: -0.058,
                steps: 117,
                point_count: 2,
                quality: QualityTally {
                    measured: 118,
                    ..QualityTally::default()
                },
            },
            points,
        }
    }

    #[test]
    fn test_profile_to_feature_geometry() {
        let feature = profile_to_feature(&sample_profile(false));
        let geometry = feature.geometry.unwrap();

        match geometry.value {
            GeoJsonValue::LineString(coords) => {
                assert_eq!(coords, vec![vec![-5.0, 56.8, 1012.0], vec![-4.95, 56.75, 640.0]]);
            }
            other => panic!("Expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_to_feature_properties() {
        let feature = profile_to_feature(&sample_profile(false));
        let props = feature.properties.unwrap();

        assert_eq!(props["dist"], 6.502);
        assert_eq!(props["max"], 1013);
        assert_eq!(props["aveGr"], -0.058);
        assert_eq!(props["pointCount"], 2);
        assert_eq!(props["quality"], "measured");
        assert!(!props.contains_key("curvature"));
    }

    #[test]
    fn test_profile_to_feature_curvature() {
        let feature = profile_to_feature(&sample_profile(true));
        let props = feature.properties.unwrap();
        assert_eq!(props["curvature"], JsonValue::from(vec![0, 3]));
    }
}
