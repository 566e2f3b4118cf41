//! Decoder for the compact LBS fingerprint sent by trackers.
//!
//! Layout, all tokens hex, separated by `-`:
//!
//! ```text
//! tok0-tok1-tok2-MCC-MNC-(AREA-CELLID-SIGNAL)+
//! ```
//!
//! The first three tokens are opaque device data. The signal is offset by 220,
//! so `dBm = SIGNAL - 220`.

use serde::Serialize;

use crate::{
    error::ValidationError,
    model::{CellRadio, TowerObservation},
};

const MIN_TOKENS: usize = 7;
const HEADER_TOKENS: usize = 5;
const SIGNAL_OFFSET: i32 = 220;

/// Towers observed by one device under one operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fingerprint {
    pub radio: CellRadio,
    pub country: u16,
    pub network: u32,
    pub towers: Vec<TowerObservation>,
}

impl Fingerprint {
    /// Decodes `s`. An incomplete trailing triple is ignored, so the minimal
    /// seven-token string yields no towers at all.
    pub fn parse(radio: CellRadio, s: &str) -> Result<Self, ValidationError> {
        let tokens: Vec<&str> = s.trim().split('-').collect();
        if tokens.len() < MIN_TOKENS {
            return Err(ValidationError::TooShort(tokens.len()));
        }

        let country: u16 = hex(tokens[3], "MCC")?;
        let network: u32 = hex(tokens[4], "MNC")?;

        let towers = tokens[HEADER_TOKENS..]
            .chunks_exact(3)
            .map(|triple| {
                let area: u16 = hex(triple[0], "area")?;
                let cell: u32 = hex(triple[1], "cell id")?;
                let signal: u16 = hex(triple[2], "signal")?;
                let dbm = i16::try_from(i32::from(signal) - SIGNAL_OFFSET)
                    .map_err(|_| bad("signal", triple[2]))?;
                Ok(TowerObservation {
                    radio,
                    country,
                    network,
                    area,
                    cell,
                    dbm,
                })
            })
            .collect::<Result<_, ValidationError>>()?;

        Ok(Self {
            radio,
            country,
            network,
            towers,
        })
    }
}

fn hex<T: TryFrom<u64>>(token: &str, field: &'static str) -> Result<T, ValidationError> {
    // from_str_radix would also take a leading plus
    if token.starts_with('+') {
        return Err(bad(field, token));
    }
    u64::from_str_radix(token, 16)
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| bad(field, token))
}

fn bad(field: &'static str, value: &str) -> ValidationError {
    ValidationError::BadField {
        field,
        value: value.to_owned(),
    }
}
