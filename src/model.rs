use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{error::ValidationError, geometry::Point};

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CellRadio {
    #[default]
    Gsm,
    #[serde(alias = "umts")]
    #[strum(to_string = "wcdma", serialize = "umts")]
    Wcdma,
    Lte,
    Cdma,
    Nr,
}

impl CellRadio {
    /// Parses a radio tag supplied alongside a fingerprint. Unknown tags,
    /// including the empty string, are rejected.
    pub fn from_tag(tag: &str) -> Result<Self, ValidationError> {
        tag.parse()
            .map_err(|_| ValidationError::UnknownRadio(tag.to_owned()))
    }
}

/// Unique key of a tower in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TowerKey {
    pub radio: CellRadio,
    pub country: u16,
    pub network: u32,
    pub area: u32,
    pub cell: u64,
}

/// One tower seen by a device, decoded from a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TowerObservation {
    pub radio: CellRadio,
    pub country: u16,
    pub network: u32,
    pub area: u16,
    pub cell: u32,
    /// received signal in dBm
    pub dbm: i16,
}

impl TowerObservation {
    pub fn key(&self) -> TowerKey {
        TowerKey {
            radio: self.radio,
            country: self.country,
            network: self.network,
            area: self.area.into(),
            cell: self.cell.into(),
        }
    }
}

/// Stored location of a tower and the radius of its coverage in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerRecord {
    pub location: Point,
    pub accuracy: f64,
}
