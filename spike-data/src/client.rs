//! Async HTTP client for the spike API.

use crate::{
    error::DataError,
    model::{SpikesPage, SymbolsResponse},
    query::SpikeQuery,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use smol_str::SmolStr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Anything that can answer spike and symbol queries.
///
/// [`SpikeApiClient`] is the HTTP implementation; tests substitute scripted sources.
#[async_trait]
pub trait SpikeSource: Send + Sync {
    async fn fetch_spikes(&self, query: &SpikeQuery) -> Result<SpikesPage, DataError>;

    async fn fetch_symbols(&self) -> Result<Vec<SmolStr>, DataError>;
}

/// Spike API client configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base url the `spikes` and `symbols` routes hang off
    pub base_url: String,
    /// Per request timeout
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ApiConfig {
    /// Create a new configuration with custom base url
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// HTTP [`SpikeSource`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct SpikeApiClient {
    http: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl SpikeApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, DataError> {
        // Url::join drops the last path segment unless it ends with '/'
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');

        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(&base)?,
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full url of `GET /spikes` for the provided query.
    pub fn spikes_url(&self, query: &SpikeQuery) -> Result<Url, DataError> {
        let mut url = self.base_url.join("spikes")?;
        url.set_query(Some(&query.to_query_string()?));
        Ok(url)
    }

    pub fn symbols_url(&self) -> Result<Url, DataError> {
        Ok(self.base_url.join("symbols")?)
    }

    /// Fetch the symbol list, retrying up to `retries` extra times on transient errors.
    pub async fn fetch_symbols_with_retry(
        &self,
        retries: usize,
    ) -> Result<Vec<SmolStr>, DataError> {
        let mut attempt = 0;
        loop {
            match self.fetch_symbols().await {
                Ok(symbols) => return Ok(symbols),
                Err(error) if error.is_transient() && attempt < retries => {
                    attempt += 1;
                    warn!(%error, attempt, "symbol fetch failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, DataError>
    where
        T: DeserializeOwned,
    {
        debug!(%url, "GET");

        let response = self
            .http
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<T>(&body).map_err(|error| DataError::Decode(error.to_string()))
    }
}

#[async_trait]
impl SpikeSource for SpikeApiClient {
    async fn fetch_spikes(&self, query: &SpikeQuery) -> Result<SpikesPage, DataError> {
        let url = self.spikes_url(query)?;
        self.get_json::<SpikesPage>(url).await
    }

    async fn fetch_symbols(&self) -> Result<Vec<SmolStr>, DataError> {
        let url = self.symbols_url()?;
        self.get_json::<SymbolsResponse>(url)
            .await
            .map(|response| response.symbols)
    }
}
