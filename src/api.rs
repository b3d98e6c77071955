use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// A remote manifest location and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub timeout: Duration,
}

/// Responsible for all remote manifest requests.
pub struct ManifestClient {
    client: reqwest::Client,
}

impl ManifestClient {
    /// Builds a client that identifies itself as the given host theme version.
    pub fn new(host_version: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let agent = format!("PrismaCore/{};", host_version);
        headers.insert(USER_AGENT, HeaderValue::from_str(&agent)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Fetches the raw manifest body. Parsing is left to the caller.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<String, FetchError> {
        debug!("Fetching {} (timeout {:?})", endpoint.url, endpoint.timeout);

        let response = self
            .client
            .get(&endpoint.url)
            .timeout(endpoint.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&endpoint.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: endpoint.url.clone(),
                status,
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&endpoint.url, e))
    }
}
