//! Reader for OpenCelliD / MLS cell exports.

use std::{collections::BTreeSet, io};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::Result,
    geometry::Point,
    model::{CellRadio, TowerKey, TowerRecord},
};

/// Serde representation of a CSV record. Columns not listed are ignored.
#[derive(Debug, Deserialize)]
struct Record {
    radio: RadioType,
    mcc: u16,
    net: u32,
    area: u32,
    cell: u64,
    lon: f64,
    lat: f64,
    range: f64,
}

/// Type of radio as written in the export
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
enum RadioType {
    Gsm,
    Umts,
    Lte,
    Cdma,
    Nr,
}

impl From<RadioType> for CellRadio {
    fn from(value: RadioType) -> Self {
        match value {
            RadioType::Gsm => CellRadio::Gsm,
            RadioType::Umts => CellRadio::Wcdma,
            RadioType::Lte => CellRadio::Lte,
            RadioType::Cdma => CellRadio::Cdma,
            RadioType::Nr => CellRadio::Nr,
        }
    }
}

/// Restricts an import to some radios and countries. Empty sets keep all.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub radios: BTreeSet<CellRadio>,
    pub countries: BTreeSet<u16>,
}

impl Filter {
    fn keeps(&self, radio: CellRadio, country: u16) -> bool {
        (self.radios.is_empty() || self.radios.contains(&radio))
            && (self.countries.is_empty() || self.countries.contains(&country))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub read: usize,
    pub kept: usize,
    pub filtered: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct ImportBatch {
    pub towers: Vec<(TowerKey, TowerRecord)>,
    pub stats: ImportStats,
}

/// Reads a CSV export with a header row. Malformed rows are logged and
/// skipped; I/O failures abort the read.
pub fn read_cells<R: io::Read>(reader: R, filter: &Filter) -> Result<ImportBatch> {
    let mut batch = ImportBatch::default();
    let mut reader = csv::Reader::from_reader(reader);

    for (i, result) in reader.deserialize::<Record>().enumerate() {
        batch.stats.read += 1;
        if (i % 1_000_000) == 0 && i != 0 {
            info!(rows = i, kept = batch.stats.kept, "reading cells");
        }

        let record = match result {
            Ok(x) => x,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!(row = i + 1, error = %e, "skipping malformed row");
                batch.stats.skipped += 1;
                continue;
            }
        };

        let radio = CellRadio::from(record.radio);
        if !filter.keeps(radio, record.mcc) {
            batch.stats.filtered += 1;
            continue;
        }

        let location = match Point::new(record.lon, record.lat) {
            Ok(x) => x,
            Err(e) => {
                warn!(row = i + 1, error = %e, "skipping row");
                batch.stats.skipped += 1;
                continue;
            }
        };

        batch.towers.push((
            TowerKey {
                radio,
                country: record.mcc,
                network: record.net,
                area: record.area,
                cell: record.cell,
            },
            TowerRecord {
                location,
                accuracy: record.range,
            },
        ));
        batch.stats.kept += 1;
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
radio,mcc,net,area,cell,unit,lon,lat,range,samples,changeable,created,updated,averageSignal
GSM,250,2,7743,22517,,37.57,55.71,1200,5,1,1459692014,1459692014,0
UMTS,250,1,7743,22518,12,37.58,55.72,800,5,1,1459692014,1459692014,0
LTE,257,2,100,5,,27.5,53.9,300,5,1,1459692014,1459692014,0
GSM,250,2,oops,1,,37.0,55.0,100,1,1,0,0,0
GSM,250,2,7743,3,,37.0,95.0,100,1,1,0,0,0
WIMAX,250,2,7743,4,,37.0,55.0,100,1,1,0,0,0
";

    #[test]
    fn reads_all() {
        let batch = read_cells(CSV.as_bytes(), &Filter::default()).unwrap();
        assert_eq!(
            batch.stats,
            ImportStats {
                read: 6,
                kept: 3,
                filtered: 0,
                skipped: 3,
            }
        );

        let (key, record) = batch.towers[1];
        assert_eq!(key.radio, CellRadio::Wcdma);
        assert_eq!(key.network, 1);
        assert_eq!(key.cell, 22518);
        assert_eq!(record.location.lon(), 37.58);
        assert_eq!(record.accuracy, 800.0);
    }

    #[test]
    fn filters() {
        let filter = Filter {
            radios: [CellRadio::Gsm, CellRadio::Lte].into(),
            countries: [250].into(),
        };
        let batch = read_cells(CSV.as_bytes(), &filter).unwrap();
        assert_eq!(batch.towers.len(), 1);
        assert_eq!(batch.towers[0].0.cell, 22517);
        assert_eq!(batch.stats.filtered, 2);
    }
}
