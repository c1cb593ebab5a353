use crate::{Error, Result};
use reqwest::{Proxy, RequestBuilder, Response};
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Connection knobs for outbound HTTP clients.
#[derive(Debug, Clone)]
pub struct HttpClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    /// Optional proxy for all outbound traffic.
    pub proxy_url: Option<String>,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: env::var("WORKFLOW_PROXY_URL").ok(),
        }
    }
}

impl HttpClientOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Build a pooled reqwest client.
pub fn build_client(options: &HttpClientOptions) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(options.timeout)
        .pool_max_idle_per_host(options.pool_max_idle_per_host)
        .pool_idle_timeout(Some(options.pool_idle_timeout));

    if let Some(proxy_url) = &options.proxy_url {
        match Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => tracing::warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy url"),
        }
    }

    builder
        .build()
        .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))
}

/// Send a request and turn transport failures into crate errors.
///
/// Non-2xx responses become [`Error::Remote`] carrying the response body,
/// reqwest timeouts become [`Error::Timeout`] for `operation`.
pub(crate) async fn send(
    request: RequestBuilder,
    operation: &str,
    timeout: Duration,
) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            Error::timeout(operation, timeout)
        } else {
            Error::Transport(TransportError::Http(e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Remote {
            status: status.as_u16(),
            message: crate::utils::preview(&body, 200),
        });
    }
    Ok(response)
}

/// Parse a successful response body as JSON.
pub(crate) async fn read_json(response: Response, operation: &str, timeout: Duration) -> Result<Value> {
    response.json::<Value>().await.map_err(|e| {
        if e.is_timeout() {
            Error::timeout(operation, timeout)
        } else {
            Error::Transport(TransportError::Http(e))
        }
    })
}

/// Minimal JSON-over-GET client for the public REST tools.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl RestClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = build_client(&HttpClientOptions::with_timeout(timeout))?;
        Ok(Self { client, timeout })
    }

    pub async fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!(url, "GET");
        let response = send(self.client.get(url), url, self.timeout).await?;
        read_json(response, url, self.timeout).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
