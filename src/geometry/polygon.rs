use geo::Intersects;
use serde::{Deserialize, Serialize};

use super::Point;
use crate::error::ValidationError;

/// A closed ring of points: the first and last vertex are always equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Builds a ring from `points`, appending the first vertex when the ring
    /// is not already closed.
    pub fn new(points: Vec<Point>) -> Result<Self, ValidationError> {
        if points.is_empty() {
            return Err(ValidationError::EmptyPolygon);
        }
        Ok(Self::from_ring(points))
    }

    // caller guarantees a non-empty ring
    pub(crate) fn from_ring(mut points: Vec<Point>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last()) {
            if first != *last {
                points.push(first);
            }
        }
        Self(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// True when `point` lies inside the ring or on its boundary.
    pub fn contains(&self, point: Point) -> bool {
        geo_types::Polygon::from(self).intersects(&geo_types::Point::from(point))
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&geo_types::Polygon::from(self)))
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = ValidationError;

    fn try_from(value: Vec<Point>) -> Result<Self, Self::Error> {
        Polygon::new(value)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(value: Polygon) -> Self {
        value.0
    }
}

impl From<&Polygon> for geo_types::Polygon<f64> {
    fn from(value: &Polygon) -> Self {
        let ring: Vec<geo_types::Coord<f64>> = value
            .0
            .iter()
            .map(|p| geo_types::coord! { x: p.lon(), y: p.lat() })
            .collect();
        geo_types::Polygon::new(ring.into(), vec![])
    }
}
