//! Tower location catalogue consulted by the resolver.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::Result,
    model::{CellRadio, TowerKey, TowerRecord},
};

pub mod import;
mod pg;

pub use pg::{ImportSummary, PgCatalogue};

/// Lookup of stored tower locations.
#[async_trait]
pub trait Catalogue: Send + Sync {
    /// Returns every stored tower of operator `(radio, country, network)`
    /// whose `(area, cell)` pair is listed in `cells`, in one round trip.
    /// No match is an empty result, not an error.
    async fn find_towers(
        &self,
        radio: CellRadio,
        country: u16,
        network: u32,
        cells: &[(u32, u64)],
    ) -> Result<Vec<TowerRecord>>;
}

/// Catalogue held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCatalogue {
    towers: RwLock<BTreeMap<TowerKey, TowerRecord>>,
}

impl MemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a tower.
    pub fn insert(&self, key: TowerKey, record: TowerRecord) {
        self.towers.write().insert(key, record);
    }

    pub fn extend(&self, towers: impl IntoIterator<Item = (TowerKey, TowerRecord)>) {
        self.towers.write().extend(towers);
    }

    pub fn len(&self) -> usize {
        self.towers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.read().is_empty()
    }
}

#[async_trait]
impl Catalogue for MemoryCatalogue {
    async fn find_towers(
        &self,
        radio: CellRadio,
        country: u16,
        network: u32,
        cells: &[(u32, u64)],
    ) -> Result<Vec<TowerRecord>> {
        let towers = self.towers.read();
        let mut found = Vec::new();
        for &(area, cell) in cells {
            let key = TowerKey {
                radio,
                country,
                network,
                area,
                cell,
            };
            if let Some(record) = towers.get(&key) {
                found.push(*record);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn key(cell: u64) -> TowerKey {
        TowerKey {
            radio: CellRadio::Gsm,
            country: 250,
            network: 2,
            area: 7760,
            cell,
        }
    }

    fn record(lon: f64) -> TowerRecord {
        TowerRecord {
            location: Point::new(lon, 55.7).unwrap(),
            accuracy: 100.0,
        }
    }

    #[tokio::test]
    async fn batched_lookup() {
        let catalogue = MemoryCatalogue::new();
        catalogue.extend([(key(1), record(37.1)), (key(2), record(37.2))]);
        catalogue.insert(
            TowerKey {
                radio: CellRadio::Lte,
                ..key(3)
            },
            record(37.3),
        );
        assert_eq!(catalogue.len(), 3);

        let found = catalogue
            .find_towers(CellRadio::Gsm, 250, 2, &[(7760, 1), (7760, 3), (7760, 2), (1, 1)])
            .await
            .unwrap();
        assert_eq!(found, vec![record(37.1), record(37.2)]);

        let none = catalogue
            .find_towers(CellRadio::Gsm, 250, 1, &[(7760, 1)])
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
