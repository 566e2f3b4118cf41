use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the geotrack core.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any I/O took place
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("empty request: no cell towers observed")]
    EmptyRequest,

    /// No matching tower or cache entry
    #[error("not found")]
    NotFound,

    /// A single provider endpoint missed its deadline
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("provider request failed: {0}")]
    Provider(#[source] reqwest::Error),

    #[error("provider {url} answered with status {status}")]
    ProviderStatus { url: String, status: u16 },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("failed to read cell export: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Only timeouts are worth another attempt (against the next endpoint).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid coordinate: lon {lon}, lat {lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("invalid radius: {0}")]
    InvalidRadius(f64),

    #[error("polygon needs at least one vertex")]
    EmptyPolygon,

    #[error("fingerprint too short: {0} tokens, need at least 7")]
    TooShort(usize),

    #[error("bad {field}: {value:?}")]
    BadField { field: &'static str, value: String },

    #[error("unknown radio type: {0:?}")]
    UnknownRadio(String),

    #[error("no provider endpoints configured")]
    NoEndpoints,
}
