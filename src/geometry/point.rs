use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Earth radius in meters used by every distance computation in the crate.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// A position on the globe, longitude first.
///
/// Both coordinates are range-checked on construction and the value never
/// changes afterwards. Serializes as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    lon: f64,
    lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Result<Self, ValidationError> {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::InvalidCoordinate { lon, lat });
        }
        Ok(Self { lon, lat })
    }

    /// Builds a point from raw trigonometry output: longitude is wrapped into
    /// (-180, 180] and latitude clamped to [-90, 90].
    pub(crate) fn wrapped(lon: f64, lat: f64) -> Self {
        Self {
            lon: normalize_longitude(lon),
            lat: lat.clamp(-90.0, 90.0),
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance(&self, other: Point) -> f64 {
        let d_lon = (other.lon - self.lon).to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
        2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
    }

    /// Initial bearing in degrees, [-180, 180], from this point toward `other`.
    pub fn bearing_to(&self, other: Point) -> f64 {
        let d_lon = (other.lon - self.lon).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let y = d_lon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
        y.atan2(x).to_degrees()
    }

    /// The point reached by travelling `distance` meters along `bearing`
    /// degrees on the sphere.
    pub fn destination(&self, distance: f64, bearing: f64) -> Point {
        let dr = distance / EARTH_RADIUS;
        let bearing = bearing.to_radians();
        let lon1 = self.lon.to_radians();
        let lat1 = self.lat.to_radians();

        let sin_lat2 = lat1.sin() * dr.cos() + lat1.cos() * dr.sin() * bearing.cos();
        let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
        let lon2 = lon1
            + (bearing.sin() * dr.sin() * lat1.cos()).atan2(dr.cos() - lat1.sin() * lat2.sin());

        Point::wrapped(lon2 * 180.0 / PI, lat2 * 180.0 / PI)
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::Point(vec![self.lon, self.lat]))
    }
}

fn normalize_longitude(lon: f64) -> f64 {
    let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if lon <= -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

impl TryFrom<[f64; 2]> for Point {
    type Error = ValidationError;

    fn try_from([lon, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Point::new(lon, lat)
    }
}

impl From<Point> for [f64; 2] {
    fn from(value: Point) -> Self {
        [value.lon, value.lat]
    }
}

impl From<Point> for geo_types::Point<f64> {
    fn from(value: Point) -> Self {
        geo_types::Point::new(value.lon, value.lat)
    }
}

/// Plain arithmetic mean of the coordinates.
///
/// Good enough for towers a few kilometers apart; it is wrong near the poles
/// and across the antimeridian. An empty slice yields the zero point.
pub fn centroid(points: &[Point]) -> Point {
    match points {
        [] => Point::default(),
        [single] => *single,
        _ => {
            let n = points.len() as f64;
            let (lon, lat) = points
                .iter()
                .fold((0.0, 0.0), |(lon, lat), p| (lon + p.lon, lat + p.lat));
            Point {
                lon: lon / n,
                lat: lat / n,
            }
        }
    }
}
