//! Geometric primitives on a spherical Earth.

mod bounds;
mod circle;
mod point;
mod polygon;

pub use bounds::Bounds;
pub use circle::{Circle, DEFAULT_SEGMENTS, SNAP_EPSILON};
pub use point::{centroid, Point, EARTH_RADIUS};
pub use polygon::Polygon;
