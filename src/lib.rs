//! Cell-tower positioning and cached GNSS assistance data.

pub mod catalogue;
pub mod config;
pub mod ephemeris;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod resolver;

pub use error::{Error, Result, ValidationError};
