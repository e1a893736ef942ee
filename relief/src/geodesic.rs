//! Spherical geometry for profile paths.
//!
//! Positions along a path are found by *chord interpolation*: both end points
//! are turned into unit direction vectors, the vectors are blended linearly
//! and the (shorter than unit) result is projected back to longitude and
//! latitude. That is not a slerp, and it drifts slightly off the true great
//! circle between end points, most visibly on long paths. Profiles are
//! expected to reproduce this approximation, so don't "fix" it.

use std::fmt;

use crate::error::{ReliefError, Result};

/// Geometric mean radius of the earth, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_001.0;

/// A WGS84 position in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    /// Longitude, east positive.
    pub lon: f64,
    /// Latitude, north positive.
    pub lat: f64,
}

impl GeoPoint {
    /// Note the argument order: longitude first, as in GeoJSON.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Check that both components are finite and within ±180° / ±90°.
    pub fn validate(self) -> Result<Self> {
        if self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
        {
            Ok(self)
        } else {
            Err(ReliefError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }

    pub fn to_radians(self) -> RadianPoint {
        RadianPoint {
            lon: self.lon.to_radians(),
            lat: self.lat.to_radians(),
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lon, self.lat)
    }
}

/// A [`GeoPoint`] in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadianPoint {
    pub lon: f64,
    pub lat: f64,
}

impl RadianPoint {
    pub fn to_degrees(self) -> GeoPoint {
        GeoPoint {
            lon: self.lon.to_degrees(),
            lat: self.lat.to_degrees(),
        }
    }

    /// Direction cosines on the unit sphere.
    pub fn direction(self) -> DirectionVector {
        let (sin_lon, cos_lon) = self.lon.sin_cos();
        let (sin_lat, cos_lat) = self.lat.sin_cos();
        DirectionVector {
            x: cos_lon * cos_lat,
            y: sin_lon * cos_lat,
            z: sin_lat,
        }
    }
}

/// Cartesian direction of a point seen from the earth's centre.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl DirectionVector {
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Component-wise `self + (other - self) * fraction`.
    pub fn lerp(self, other: Self, fraction: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * fraction,
            y: self.y + (other.y - self.y) * fraction,
            z: self.z + (other.z - self.z) * fraction,
        }
    }

    /// Project back to longitude/latitude. The vector need not be unit length.
    ///
    /// `atan2` keeps the result defined when `x == 0` and puts longitudes
    /// beyond ±90° in the right quadrant.
    pub fn to_radian_point(self) -> RadianPoint {
        RadianPoint {
            lon: self.y.atan2(self.x),
            lat: self.z.atan2(self.x.hypot(self.y)),
        }
    }
}

/// Angle subtended at the earth's centre by two points, in radians.
///
/// The dot product is clamped to 1 so that nearly identical points don't
/// produce `NaN`.
pub fn angular_distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    central_angle(p1.to_radians().direction(), p2.to_radians().direction())
}

fn central_angle(d1: DirectionVector, d2: DirectionVector) -> f64 {
    // A vector dotted with itself can land one ulp below 1.
    if d1 == d2 {
        return 0.0;
    }
    d1.dot(d2).min(1.0).acos()
}

/// Chord-interpolated position `fraction` of the way from `p1` to `p2`.
pub fn interpolate(p1: GeoPoint, p2: GeoPoint, fraction: f64) -> GeoPoint {
    GeodesicPath::new(p1, p2).point_at(fraction)
}

/// A path between two points with the direction vectors precomputed.
#[derive(Debug, Clone, Copy)]
pub struct GeodesicPath {
    start: GeoPoint,
    end: GeoPoint,
    from: DirectionVector,
    to: DirectionVector,
    angle: f64,
}

impl GeodesicPath {
    pub fn new(start: GeoPoint, end: GeoPoint) -> Self {
        let from = start.to_radians().direction();
        let to = end.to_radians().direction();
        Self {
            start,
            end,
            from,
            to,
            angle: central_angle(from, to),
        }
    }

    pub fn start(&self) -> GeoPoint {
        self.start
    }

    pub fn end(&self) -> GeoPoint {
        self.end
    }

    /// Angular length of the path, in radians.
    pub fn angular_distance(&self) -> f64 {
        self.angle
    }

    /// Surface length of the path on the mean sphere, in metres.
    pub fn distance_m(&self) -> f64 {
        self.angle * EARTH_RADIUS_M
    }

    /// Number of steps needed so that no step exceeds `step_angle` radians.
    /// Always at least 1.
    pub fn step_count(&self, step_angle: f64) -> usize {
        ((self.angle / step_angle).ceil() as usize).max(1)
    }

    /// Chord-interpolated position at `fraction` (0 = start, 1 = end).
    pub fn point_at(&self, fraction: f64) -> GeoPoint {
        self.from
            .lerp(self.to, fraction)
            .to_radian_point()
            .to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_angular_distance_same_point_is_zero() {
        for p in [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-0.12, 51.5),
            GeoPoint::new(138.7274, 35.3606),
            GeoPoint::new(-179.9, -59.9),
            GeoPoint::new(12.345678, 89.999),
        ] {
            assert_eq!(angular_distance(p, p), 0.0, "{p}");
        }
    }

    #[test]
    fn test_angular_distance_known_values() {
        // A quarter of the equator
        let d = angular_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(90.0, 0.0));
        assert!((d - std::f64::consts::FRAC_PI_2).abs() < EPS);

        // One degree of latitude along a meridian
        let d = angular_distance(GeoPoint::new(-3.0, 50.0), GeoPoint::new(-3.0, 51.0));
        assert!((d - 1f64.to_radians()).abs() < EPS);
    }

    #[test]
    fn test_angular_distance_symmetric() {
        let a = GeoPoint::new(-5.7, 50.06);
        let b = GeoPoint::new(-3.07, 58.64);
        assert!((angular_distance(a, b) - angular_distance(b, a)).abs() < 1e-15);
    }

    #[test]
    fn test_interpolate_end_points() {
        let a = GeoPoint::new(-5.7, 50.06);
        let b = GeoPoint::new(-3.07, 58.64);

        let start = interpolate(a, b, 0.0);
        let end = interpolate(a, b, 1.0);
        assert!((start.lon - a.lon).abs() < EPS && (start.lat - a.lat).abs() < EPS);
        assert!((end.lon - b.lon).abs() < EPS && (end.lat - b.lat).abs() < EPS);
    }

    #[test]
    fn test_interpolate_along_equator_and_meridian() {
        let mid = interpolate(GeoPoint::new(10.0, 0.0), GeoPoint::new(20.0, 0.0), 0.5);
        assert!((mid.lon - 15.0).abs() < EPS);
        assert!(mid.lat.abs() < EPS);

        let mid = interpolate(GeoPoint::new(2.0, 40.0), GeoPoint::new(2.0, 50.0), 0.5);
        assert!((mid.lon - 2.0).abs() < EPS);
        assert!((mid.lat - 45.0).abs() < EPS);
    }

    #[test]
    fn test_chord_interpolation_is_not_slerp() {
        // Over a 60° arc, the chord midpoint is still on the great circle
        // (by symmetry), but the quarter point is not at a quarter of the
        // angle.
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(60.0, 0.0);
        let quarter = interpolate(a, b, 0.25);
        assert!(quarter.lat.abs() < EPS);
        assert!((quarter.lon - 15.0).abs() > 0.1);
        assert!(quarter.lon > 0.0 && quarter.lon < 30.0);
    }

    #[test]
    fn test_interpolate_defined_on_ninety_degree_meridian() {
        // Direction vector has x == 0 here.
        let p = interpolate(GeoPoint::new(90.0, 10.0), GeoPoint::new(90.0, 20.0), 0.5);
        assert!((p.lon - 90.0).abs() < EPS);
        assert!((p.lat - 15.0).abs() < EPS);

        let p = interpolate(GeoPoint::new(-90.0, 0.0), GeoPoint::new(-90.0, 0.0), 0.3);
        assert!((p.lon + 90.0).abs() < EPS);
    }

    #[test]
    fn test_interpolate_keeps_quadrant_beyond_ninety() {
        let p = interpolate(GeoPoint::new(135.0, 35.0), GeoPoint::new(140.0, 36.0), 0.5);
        assert!(p.lon > 135.0 && p.lon < 140.0);

        let p = interpolate(GeoPoint::new(-120.0, -10.0), GeoPoint::new(-121.0, -10.0), 0.5);
        assert!(p.lon < -120.0 && p.lon > -121.0);
    }

    #[test]
    fn test_step_count() {
        let path = GeodesicPath::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.0));
        assert_eq!(path.step_count(1e-4), 1);

        let path = GeodesicPath::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        let step = (1.0f64 / 1200.0).to_radians();
        let n = path.step_count(step);
        assert!((1200..=1201).contains(&n));
    }

    #[test]
    fn test_validate() {
        assert!(GeoPoint::new(-0.12, 51.5).validate().is_ok());
        assert!(GeoPoint::new(180.0, -90.0).validate().is_ok());
        assert!(GeoPoint::new(181.0, 0.0).validate().is_err());
        assert!(GeoPoint::new(0.0, f64::NAN).validate().is_err());
        assert!(GeoPoint::new(f64::INFINITY, 0.0).validate().is_err());
    }
}
