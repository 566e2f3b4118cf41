use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Profile, Provider};
use crate::{
    config::UbloxConfig,
    error::{Error, Result, ValidationError},
    geometry::Point,
};

/// Accuracies the service treats as "unknown" or that are too coarse to
/// filter on.
const PACC_DEFAULT: u32 = 300_000;
const PACC_MAX: u32 = 6_000_000;

/// u-blox AssistNow Online client with sequential failover over its
/// configured servers.
#[derive(Debug, Clone)]
pub struct UbloxClient {
    token: String,
    servers: Vec<String>,
    pacc: Option<u32>,
    http: reqwest::Client,
}

impl UbloxClient {
    pub fn new(config: &UbloxConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(Error::Provider)?;
        Self::with_client(config, http)
    }

    /// Uses `http` as is; the per-request timeout is whatever it was built with.
    pub fn with_client(config: &UbloxConfig, http: reqwest::Client) -> Result<Self> {
        if config.servers.is_empty() {
            return Err(ValidationError::NoEndpoints.into());
        }

        Ok(Self {
            token: config.token.clone(),
            servers: config.servers.clone(),
            pacc: (config.pacc < PACC_MAX && config.pacc != PACC_DEFAULT).then_some(config.pacc),
            http,
        })
    }

    fn query(&self, point: Option<Point>, profile: &Profile) -> String {
        let mut params = vec![format!("token={}", self.token)];
        params.extend(profile.params());
        if let Some(point) = point {
            params.push(format!("lon={:.6}", point.lon()));
            params.push(format!("lat={:.6}", point.lat()));
            if let Some(pacc) = self.pacc {
                params.push(format!("pacc={pacc}"));
            }
            if profile.filter_on_pos {
                params.push("filteronpos".into());
            }
        }
        params.join(";")
    }

    async fn request(&self, server: &str, query: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(format!("{server}?{query}"))
            .send()
            .await
            .map_err(|e| classify(server, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProviderStatus {
                url: server.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(server, e))?;
        info!(server, bytes = body.len(), "received assistance data");
        Ok(body.to_vec())
    }
}

// the request url carries the token, keep it out of error messages
fn classify(server: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            url: server.to_owned(),
        }
    } else {
        Error::Provider(e.without_url())
    }
}

#[async_trait]
impl Provider for UbloxClient {
    async fn fetch_online(&self, point: Option<Point>, profile: &Profile) -> Result<Vec<u8>> {
        let query = self.query(point, profile);

        let mut servers = self.servers.iter().peekable();
        while let Some(server) = servers.next() {
            debug!(server, "requesting assistance data");
            match self.request(server, &query).await {
                Err(e) if e.is_retryable() && servers.peek().is_some() => {
                    warn!(server, "timed out, trying next server");
                }
                result => return result,
            }
        }
        Err(ValidationError::NoEndpoints.into())
    }
}
