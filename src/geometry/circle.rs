use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{Bounds, Point, Polygon, EARTH_RADIUS};
use crate::error::ValidationError;

/// Default number of segments used when a circle is turned into a polygon.
pub const DEFAULT_SEGMENTS: usize = 16;

/// Trigonometric residues below this magnitude are snapped to zero while
/// tessellating, so axis-aligned vertices come out exactly on the axis.
pub const SNAP_EPSILON: f64 = 0.01;

/// A center and a radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    /// Fails unless `radius` is finite and not negative.
    pub fn new(center: Point, radius: f64) -> Result<Self, ValidationError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(ValidationError::InvalidRadius(radius));
        }
        Ok(Self { center, radius })
    }

    pub fn contains(&self, point: Point) -> bool {
        self.center.distance(point) <= self.radius
    }

    /// Tessellates the circle into `segments` equal steps plus a closing
    /// vertex. Fewer than 3 segments are raised to 3.
    ///
    /// Longitude offsets are scaled by `1 / cos(lat)` so the ring stays round
    /// away from the equator. Near the poles the scale blows up and the ring
    /// degenerates; vertices are still valid points.
    pub fn polygon(&self, segments: usize) -> Polygon {
        let segments = segments.max(3);
        let (r_lat, r_lon) = self.angular_radius();
        let step = 2.0 * PI / segments as f64;

        let ring = (0..=segments)
            .map(|i| {
                let theta = step * i as f64;
                let x = snap(theta.cos());
                let y = snap(theta.sin());
                Point::wrapped(self.center.lon() + y * r_lon, self.center.lat() + x * r_lat)
            })
            .collect();

        Polygon::from_ring(ring)
    }

    /// Smallest latitude/longitude box holding the whole circle.
    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.center, self.radius)
    }

    /// Exports the tessellated ring, since GeoJSON has no circle type.
    pub fn to_geojson(&self, segments: usize) -> geojson::Geometry {
        self.polygon(segments).to_geojson()
    }

    fn angular_radius(&self) -> (f64, f64) {
        let r_lat = self.radius / EARTH_RADIUS * 180.0 / PI;
        let r_lon = r_lat / self.center.lat().to_radians().cos();
        (r_lat, r_lon)
    }
}

fn snap(v: f64) -> f64 {
    if v.abs() < SNAP_EPSILON {
        0.0
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> Point {
        Point::new(37.57351, 55.715084).unwrap()
    }

    #[test]
    fn tessellation() {
        let circle = Circle::new(work(), 500.0).unwrap();
        let polygon = circle.polygon(16);
        let points = polygon.points();

        assert_eq!(points.len(), 17);
        assert_eq!(points[0], points[16]);
        for p in points {
            let d = circle.center.distance(*p);
            assert!((d - 500.0).abs() <= 5.0, "vertex {p:?} is {d}m away");
        }
    }

    #[test]
    fn snapped_axes() {
        let circle = Circle::new(work(), 500.0).unwrap();
        let points = circle.polygon(16).points().to_vec();

        // theta = 0 and 180 degrees sit exactly on the meridian,
        // 90 and 270 exactly on the parallel
        assert_eq!(points[0].lon(), circle.center.lon());
        assert_eq!(points[8].lon(), circle.center.lon());
        assert_eq!(points[4].lat(), circle.center.lat());
        assert_eq!(points[12].lat(), circle.center.lat());
    }

    #[test]
    fn segments_floor() {
        let polygon = Circle::new(work(), 100.0).unwrap().polygon(0);
        assert_eq!(polygon.points().len(), 4);
    }

    #[test]
    fn antimeridian_ring_is_valid() {
        let circle = Circle::new(Point::new(179.9999, 10.0).unwrap(), 1_000.0).unwrap();
        for p in circle.polygon(16).points() {
            assert!((-180.0..=180.0).contains(&p.lon()));
        }
        assert!(circle.bounds().lon.is_none());
    }

    #[test]
    fn bounds_enclose_circle() {
        let circle = Circle::new(work(), 100_000.0).unwrap();
        let bounds = circle.bounds();
        assert!(bounds.lon.is_some());
        for p in circle.polygon(64).points() {
            assert!(bounds.contains(*p));
        }
    }

    #[test]
    fn contains() {
        let circle = Circle::new(work(), 500.0).unwrap();
        assert!(circle.contains(work().destination(499.0, 10.0)));
        assert!(!circle.contains(work().destination(501.0, 10.0)));
    }

    #[test]
    fn geojson_polygon() {
        let value = serde_json::to_value(Circle::new(work(), 500.0).unwrap().to_geojson(16)).unwrap();
        assert_eq!(value["type"], "Polygon");
        let ring = value["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 17);
        assert_eq!(ring[0], ring[16]);
    }

    #[test]
    fn rejects_bad_radius() {
        for radius in [-5.0, f64::NAN, f64::INFINITY] {
            let err = Circle::new(work(), radius).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidRadius(_)));
        }
        assert_eq!(Circle::new(work(), 0.0).unwrap().radius, 0.0);
    }
}
