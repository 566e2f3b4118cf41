use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{ephemeris::Profile, geometry::DEFAULT_SEGMENTS, model::CellRadio};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub lbs: LbsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub ublox: Option<UbloxConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub circle_segments: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            circle_segments: DEFAULT_SEGMENTS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LbsConfig {
    /// radio assumed when a fingerprint arrives without a tag
    pub default_radio: CellRadio,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// meters
    pub max_distance: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            max_distance: 100_000.0,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UbloxConfig {
    pub token: String,
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// position accuracy in meters sent along with a point
    #[serde(default = "default_pacc")]
    pub pacc: u32,
    #[serde(default)]
    pub profile: Profile,
}

impl UbloxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_servers() -> Vec<String> {
    vec![
        "http://online-live1.services.u-blox.com/GetOnlineData.ashx".into(),
        "http://online-live2.services.u-blox.com/GetOnlineData.ashx".into(),
    ]
}

fn default_timeout() -> u64 {
    5
}

fn default_pacc() -> u32 {
    100_000
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    let config = toml::from_str(&data).context("Failed to parse config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn minimal() {
        let config: Config = toml::from_str("database_url = \"postgres://localhost/geotrack\"").unwrap();
        assert_eq!(config.geometry.circle_segments, 16);
        assert_eq!(config.cache.ttl(), Duration::from_secs(1800));
        assert_eq!(config.cache.max_distance, 100_000.0);
        assert_eq!(config.lbs.default_radio, CellRadio::Gsm);
        assert_eq!(config.log.filter, "info");
        assert!(config.ublox.is_none());
    }

    #[test]
    fn load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
database_url = "postgres://localhost/geotrack"

[lbs]
default_radio = "lte"

[cache]
ttl_secs = 60

[ublox]
token = "secret"
timeout_secs = 2

[ublox.profile]
format = "mga"
gnss = ["gps", "glo"]
"#
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.lbs.default_radio, CellRadio::Lte);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_distance, 100_000.0);

        let ublox = config.ublox.unwrap();
        assert_eq!(ublox.token, "secret");
        assert_eq!(ublox.servers.len(), 2);
        assert_eq!(ublox.timeout(), Duration::from_secs(2));
        assert_eq!(ublox.pacc, 100_000);
        assert_eq!(ublox.profile.format, "mga");
        assert!(ublox.profile.filter_on_pos);
    }

    #[test]
    fn missing_file() {
        let err = load(Path::new("/nonexistent/geotrack.toml")).unwrap_err();
        assert_eq!(err.to_string(), "Failed to read config");
    }
}
