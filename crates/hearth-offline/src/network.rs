//! Network access for the worker

use async_trait::async_trait;
use reqwest::{header, Client};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{OfflineError, Request, Response, Result, RetryConfig};

/// Fetches requests from the network
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request once.
    ///
    /// Every HTTP response, whatever its status, is `Ok`. An error means the
    /// request never got a response (connection refused, reset, DNS).
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Run `attempt` until it yields a 2xx response or retries run out.
///
/// A non-2xx response is retried unless its status is denied (or not
/// allowed) by the configuration, in which case it is returned as
/// [`OfflineError::Http`]. Transport errors are retried when
/// [`OfflineError::is_retryable`] says so.
pub async fn fetch_with_retry<F, Fut>(config: &RetryConfig, mut attempt: F) -> Result<Response>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    config.validate()?;

    let mut last_error = OfflineError::Connection("No attempts made".into());
    for n in 1..=config.max_attempts {
        if n > 1 {
            let delay = config.delay_for(n - 1);
            debug!("Retry attempt {} after {:?}", n, delay);
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
        }

        match attempt(n).await {
            Ok(response) if response.is_ok() => return Ok(response),
            Ok(response) => {
                let error = OfflineError::Http {
                    status: response.status,
                    message: response.status_text.clone(),
                };
                if !config.should_retry_status(response.status) {
                    return Err(error);
                }
                warn!("Request failed (attempt {}): {}", n, error);
                last_error = error;
            }
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }
                warn!("Request failed (attempt {}): {}", n, e);
                last_error = e;
            }
        }
    }

    Err(OfflineError::RetriesExhausted(last_error.to_string()))
}

/// Configuration for [`HttpNetwork`]
///
/// The defaults behave like a plain browser fetch: no client timeouts and a
/// single attempt. Timeouts and retries are opt-in.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Option<Duration>,
    /// User agent
    pub user_agent: String,
    /// Retry configuration used by [`HttpNetwork::fetch_retrying`]
    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            user_agent: format!("hearth-offline/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::none(),
        }
    }
}

/// Network backed by an HTTP client
pub struct HttpNetwork {
    client: Client,
    config: HttpConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network
    pub fn new(config: HttpConfig) -> Result<Self> {
        config.retry.validate()?;
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| OfflineError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Retry configuration in use
    pub fn retry(&self) -> &RetryConfig {
        &self.config.retry
    }

    /// Fetch with the configured retry policy.
    ///
    /// Unlike [`Network::fetch`], a non-2xx status is an error here once
    /// the policy gives up. Suited to loaders that need a good response.
    pub async fn fetch_retrying(&self, request: &Request) -> Result<Response> {
        fetch_with_retry(&self.config.retry, |_| self.fetch_once(request)).await
    }

    /// Single fetch attempt; any HTTP status is a response
    async fn fetch_once(&self, request: &Request) -> Result<Response> {
        let mut builder = self.client.get(request.url.clone());
        if !request.referrer.is_empty() {
            builder = builder.header(header::REFERER, request.referrer.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        debug!("Fetching: {}", request.url);
        self.fetch_once(request).await
    }
}
