//! HTTP client for fetching pages

use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::proxy::ProxyEndpoint;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),

    #[error("HTTP {status}: {reason}")]
    BadStatus { status: u16, reason: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Total attempts per fetch, including the first
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_attempts: 2,
            retry_backoff: Duration::from_secs(1),
            user_agent: "Mozilla/5.0 (compatible; keysweep/0.1)".to_string(),
        }
    }
}

/// Page fetcher bound to one (optional) proxy
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Create a new HTTP client, routed through `proxy` when given
    pub fn new(config: HttpConfig, proxy: Option<&ProxyEndpoint>) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(proxy) = proxy {
            let proxy = Proxy::all(&proxy.uri)
                .map_err(|e| FetchError::InvalidProxy(format!("{}: {}", proxy.uri, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Fetch a page body as text, retrying with exponential backoff
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.fetch_once(url).await {
                Ok(body) => {
                    if attempts > 1 {
                        debug!(url, attempts, "Fetch succeeded after retry");
                    }
                    return Ok(body);
                }
                Err(e) => {
                    if attempts >= self.config.max_attempts.max(1) {
                        return Err(e);
                    }

                    warn!(url, attempts, error = %e, "Fetch failed, retrying");

                    let backoff = self.config.retry_backoff * 2u32.pow(attempts - 1);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Fetch once (no retry)
    async fn fetch_once(&self, url: &str) -> Result<String> {
        debug!(url, "Starting fetch");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {}", e)))?;

        debug!(url, size = body.len(), "Fetch completed");

        Ok(body)
    }
}
