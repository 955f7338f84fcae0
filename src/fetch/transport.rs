//! Underlying HTTP transport: pooled client, timeouts, throttling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Request, Response};
use tracing::{debug, instrument};

use super::RateLimiter;
use crate::user_agent;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Two requests per second per host.
const RATE_LIMIT_MS: u64 = 500;

/// Executes one HTTP request.
///
/// The seam between the authenticating pipeline and the network. Implementors
/// own throttling, pooling and timeouts; they never inspect status codes.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the response, whatever its status.
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error>;
}

/// Timeouts and throttling for [`HttpTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
    /// Minimum spacing between requests to one host (zero disables).
    pub rate_limit: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            rate_limit: Duration::from_millis(RATE_LIMIT_MS),
        }
    }
}

/// `reqwest`-backed transport sharing one connection pool and one limiter.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpTransport {
    /// Builds a transport with its own rate limiter.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error when the client cannot be constructed.
    pub fn new(settings: &TransportSettings) -> Result<Self, reqwest::Error> {
        Self::with_rate_limiter(settings, Arc::new(RateLimiter::new(settings.rate_limit)))
    }

    /// Builds a transport sharing an existing rate limiter.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error when the client cannot be constructed.
    pub fn with_rate_limiter(
        settings: &TransportSettings,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, reqwest::Error> {
        let client = base_builder(settings).build()?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Returns the shared rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }
}

fn base_builder(settings: &TransportSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.read_timeout)
        .user_agent(user_agent::default_site_user_agent())
        .gzip(true)
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        level = "debug",
        skip(self, request),
        fields(method = %request.method(), url = %request.url())
    )]
    async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.rate_limiter.acquire(request.url()).await;
        let response = self.client.execute(request).await?;
        debug!(status = response.status().as_u16(), "response received");
        Ok(response)
    }
}
