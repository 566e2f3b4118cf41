//! Position estimation from observed cell towers.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    catalogue::Catalogue,
    error::{Error, Result, ValidationError},
    fingerprint::Fingerprint,
    geometry::{centroid, Circle, Point},
    model::{CellRadio, TowerObservation},
};

/// A position and the radius in meters it is guaranteed to lie within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "LocationResponse")]
pub struct Estimate {
    pub location: Point,
    pub accuracy: f64,
}

impl Estimate {
    pub fn circle(&self) -> std::result::Result<Circle, ValidationError> {
        Circle::new(self.location, self.accuracy)
    }
}

#[derive(Serialize)]
struct LocationResponse {
    location: Location,
    accuracy: f64,
}

#[derive(Serialize)]
struct Location {
    lat: f64,
    lng: f64,
}

impl From<Estimate> for LocationResponse {
    fn from(value: Estimate) -> Self {
        LocationResponse {
            location: Location {
                lat: value.location.lat(),
                lng: value.location.lon(),
            },
            accuracy: value.accuracy,
        }
    }
}

pub struct Resolver<C> {
    catalogue: C,
}

impl<C: Catalogue> Resolver<C> {
    pub fn new(catalogue: C) -> Self {
        Self { catalogue }
    }

    pub fn catalogue(&self) -> &C {
        &self.catalogue
    }

    /// Estimates the position of a device that observed `observations` on
    /// operator `(radio, country, network)`.
    ///
    /// The estimate is the centroid of every known tower, and the accuracy the
    /// smallest radius around it that still covers each tower's own range.
    /// Catalogue errors are returned as they are.
    pub async fn resolve(
        &self,
        radio: CellRadio,
        country: u16,
        network: u32,
        observations: &[TowerObservation],
    ) -> Result<Estimate> {
        if observations.is_empty() {
            return Err(Error::EmptyRequest);
        }

        let cells: Vec<(u32, u64)> = observations
            .iter()
            .map(|x| (u32::from(x.area), u64::from(x.cell)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let towers = self
            .catalogue
            .find_towers(radio, country, network, &cells)
            .await?;
        debug!(
            %radio,
            country,
            network,
            observed = cells.len(),
            matched = towers.len(),
            "catalogue lookup"
        );
        if towers.is_empty() {
            return Err(Error::NotFound);
        }

        let points: Vec<Point> = towers.iter().map(|t| t.location).collect();
        let location = centroid(&points);
        let accuracy = towers
            .iter()
            .map(|t| location.distance(t.location) + t.accuracy)
            .fold(0.0, f64::max);

        info!(
            lon = location.lon(),
            lat = location.lat(),
            accuracy,
            "resolved position"
        );
        Ok(Estimate { location, accuracy })
    }

    /// Decodes `fingerprint` and resolves it.
    pub async fn locate(&self, radio: CellRadio, fingerprint: &str) -> Result<Estimate> {
        let fp = Fingerprint::parse(radio, fingerprint)?;
        self.resolve(fp.radio, fp.country, fp.network, &fp.towers)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use approx::assert_abs_diff_eq;
    use async_trait::async_trait;

    use super::*;
    use crate::{
        catalogue::MemoryCatalogue,
        model::{TowerKey, TowerRecord},
    };

    fn observation(cell: u32) -> TowerObservation {
        TowerObservation {
            radio: CellRadio::Gsm,
            country: 250,
            network: 2,
            area: 7760,
            cell,
            dbm: -80,
        }
    }

    fn tower(cell: u32, lon: f64, lat: f64, accuracy: f64) -> (TowerKey, TowerRecord) {
        (
            observation(cell).key(),
            TowerRecord {
                location: Point::new(lon, lat).unwrap(),
                accuracy,
            },
        )
    }

    fn resolver(towers: Vec<(TowerKey, TowerRecord)>) -> Resolver<MemoryCatalogue> {
        let catalogue = MemoryCatalogue::new();
        catalogue.extend(towers);
        Resolver::new(catalogue)
    }

    #[tokio::test]
    async fn empty_request() {
        let r = resolver(vec![]);
        let err = r.resolve(CellRadio::Gsm, 250, 2, &[]).await.unwrap_err();
        assert!(matches!(err, Error::EmptyRequest));
    }

    #[tokio::test]
    async fn not_found() {
        let r = resolver(vec![tower(1, 37.0, 55.0, 100.0)]);
        let err = r
            .resolve(CellRadio::Gsm, 250, 2, &[observation(2)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));

        // same cell on another operator is a different tower
        let err = r
            .resolve(CellRadio::Gsm, 250, 1, &[observation(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[tokio::test]
    async fn single_tower_identity() {
        let r = resolver(vec![tower(1, 37.57351, 55.715084, 1200.0)]);
        let estimate = r
            .resolve(CellRadio::Gsm, 250, 2, &[observation(1), observation(9)])
            .await
            .unwrap();
        assert_eq!(estimate.location, Point::new(37.57351, 55.715084).unwrap());
        assert_eq!(estimate.accuracy, 1200.0);
    }

    #[tokio::test]
    async fn centroid_and_enclosing_radius() {
        let a = Point::new(37.0, 55.0).unwrap();
        let b = Point::new(37.02, 55.0).unwrap();
        let r = resolver(vec![
            tower(1, a.lon(), a.lat(), 100.0),
            tower(2, b.lon(), b.lat(), 400.0),
        ]);
        let estimate = r
            .resolve(CellRadio::Gsm, 250, 2, &[observation(1), observation(2)])
            .await
            .unwrap();

        assert_abs_diff_eq!(estimate.location.lon(), 37.01, epsilon = 1e-12);
        assert_abs_diff_eq!(estimate.location.lat(), 55.0, epsilon = 1e-12);

        let half = estimate.location.distance(b);
        assert_abs_diff_eq!(estimate.accuracy, half + 400.0, epsilon = 1e-6);
        assert!(estimate.circle().unwrap().contains(a));
        assert!(estimate.circle().unwrap().contains(b.destination(399.0, 90.0)));
    }

    #[tokio::test]
    async fn locate_fingerprint() {
        let r = resolver(vec![tower(0x772a, 37.6, 55.7, 500.0)]);
        let estimate = r
            .locate(
                CellRadio::Gsm,
                "864078-35827-010003698-fa-2-1e50-772a-95-1e50-773c-a6",
            )
            .await
            .unwrap();
        assert_eq!(estimate.accuracy, 500.0);

        let err = r.locate(CellRadio::Gsm, "1-2-3").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = r.locate(CellRadio::Gsm, "1-2-3-fa-2-1e50-772a").await.unwrap_err();
        assert!(matches!(err, Error::EmptyRequest));
    }

    struct Failing(AtomicUsize);

    #[async_trait]
    impl Catalogue for Failing {
        async fn find_towers(
            &self,
            _: CellRadio,
            _: u16,
            _: u32,
            cells: &[(u32, u64)],
        ) -> Result<Vec<TowerRecord>> {
            assert_eq!(cells.len(), 2);
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(Error::Store(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn single_batched_lookup_and_errors_propagate() {
        let r = Resolver::new(Failing(AtomicUsize::new(0)));
        let err = r
            .resolve(
                CellRadio::Gsm,
                250,
                2,
                &[observation(1), observation(2), observation(1)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(sqlx::Error::PoolTimedOut)));
        assert_eq!(r.catalogue().0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn response_shape() {
        let estimate = Estimate {
            location: Point::new(37.5, 55.7).unwrap(),
            accuracy: 250.0,
        };
        assert_eq!(
            serde_json::to_value(estimate).unwrap(),
            serde_json::json!({ "location": { "lat": 55.7, "lng": 37.5 }, "accuracy": 250.0 })
        );
    }
}
