use super::{Point, EARTH_RADIUS};

/// Latitude/longitude box used to prefilter nearest-point searches.
///
/// `lon` is `None` when the box would cross the antimeridian or touch a
/// pole; only the latitude band applies then.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lon: Option<(f64, f64)>,
}

impl Bounds {
    /// Box around every point within `radius` meters of `center`.
    pub fn around(center: Point, radius: f64) -> Self {
        let dr = radius / EARTH_RADIUS;
        let r_lat = dr.to_degrees();
        let min_lat = center.lat() - r_lat;
        let max_lat = center.lat() + r_lat;

        // widest longitude offset of a spherical cap
        let s = dr.sin() / center.lat().to_radians().cos();
        let lon = if min_lat > -90.0 && max_lat < 90.0 && dr < std::f64::consts::FRAC_PI_2 && s < 1.0 {
            let r_lon = s.asin().to_degrees();
            let (min_lon, max_lon) = (center.lon() - r_lon, center.lon() + r_lon);
            (min_lon >= -180.0 && max_lon <= 180.0).then_some((min_lon, max_lon))
        } else {
            None
        };

        Self {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            lon,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        let lat_ok = (self.min_lat..=self.max_lat).contains(&p.lat());
        match self.lon {
            Some((min_lon, max_lon)) => lat_ok && (min_lon..=max_lon).contains(&p.lon()),
            None => lat_ok,
        }
    }
}
