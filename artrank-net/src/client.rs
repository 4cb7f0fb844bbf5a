//! HTTP client
//!
//! Builds the shared `reqwest` client. Proxies are taken from the usual
//! `http_proxy` / `https_proxy` environment variables.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Courtesy delay before every remote request, in milliseconds
    pub request_delay_ms: u64,
    /// User agent sent to remote services
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            request_delay_ms: 200,
            user_agent: "ArtRank-Affiliation-Enricher/0.1 (+https://github.com/researchartifacts/artrank)"
                .to_string(),
        }
    }
}

impl HttpConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Errors from remote sources and local caches
#[derive(Debug, Error)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create the HTTP client used for all remote lookups
pub fn create_client(config: &HttpConfig) -> Result<Client, NetError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| NetError::ClientBuild(e.to_string()))
}

/// GET a URL and return its body, treating non-2xx statuses as errors
pub async fn fetch_text(
    client: &Client,
    url: &str,
    timeout: Option<Duration>,
) -> Result<String, NetError> {
    debug!("Fetching: {}", url);

    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }
    let response = request.send().await?;

    if !response.status().is_success() {
        return Err(NetError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    Ok(response.text().await?)
}
