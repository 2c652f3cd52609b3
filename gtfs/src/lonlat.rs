use std::fmt;

use geo::{Euclidean, InterpolatePoint, Point};
use serde::{Deserialize, Serialize};

/// geo's `Haversine` uses the GRS80 mean radius; distances here are defined against this one.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 position. Coordinates that failed to parse are NaN and propagate as unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat(Point<f64>);

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self(Point::new(lon, lat))
    }

    pub fn unknown() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub fn longitude(self) -> f64 {
        self.0.x()
    }

    pub fn latitude(self) -> f64 {
        self.0.y()
    }

    pub fn is_valid(self) -> bool {
        self.0.x().is_finite() && self.0.y().is_finite()
    }

    /// Great-circle distance in meters
    pub fn gps_dist(self, other: LonLat) -> f64 {
        haversine_meters(self.latitude(), self.longitude(), other.latitude(), other.longitude())
    }

    /// Linear interpolation in degrees. Fine over the short distances between two path points.
    pub fn lerp(self, other: LonLat, pct: f64) -> LonLat {
        LonLat(Euclidean.point_at_ratio_between(self.0, other.0, pct))
    }
}

impl From<LonLat> for Point<f64> {
    fn from(pt: LonLat) -> Self {
        pt.0
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.longitude(), self.latitude())
    }
}

pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_METERS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::{Distance, Haversine};

    use super::*;

    #[test]
    fn one_degree_at_the_equator() {
        let dist = haversine_meters(0.0, 0.0, 0.0, 1.0);
        assert!((dist - 111_195.0).abs() < 0.01 * 111_195.0);
    }

    #[test]
    fn agrees_with_geo_up_to_the_radius() {
        let a = LonLat::new(-122.3, 47.6);
        let b = LonLat::new(-122.1, 47.7);
        let ours = a.gps_dist(b);
        let theirs = Haversine.distance(Point::from(a), Point::from(b));
        assert_relative_eq!(ours, theirs, max_relative = 1e-5);
    }

    #[test]
    fn lerp_halfway() {
        let mid = LonLat::new(0.0, 10.0).lerp(LonLat::new(2.0, 12.0), 0.5);
        assert_relative_eq!(mid.longitude(), 1.0);
        assert_relative_eq!(mid.latitude(), 11.0);
    }

    #[test]
    fn same_point() {
        let pt = LonLat::new(-122.3, 47.6);
        assert_eq!(pt.gps_dist(pt), 0.0);
    }

    #[test]
    fn unknown_propagates() {
        let pt = LonLat::unknown();
        assert!(!pt.is_valid());
        assert!(pt.gps_dist(LonLat::new(0.0, 0.0)).is_nan());
    }
}
