//! Per-host request throttling.
//!
//! Every request to the same host waits until the configured interval has
//! elapsed since the previous one. Hosts are throttled independently, so
//! page images served from a CDN do not slow down forum pages.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use url::Url;
//! use zerobyw_core::fetch::RateLimiter;
//!
//! # async fn example() -> Result<(), url::ParseError> {
//! let limiter = RateLimiter::new(Duration::from_millis(500));
//! limiter.acquire(&Url::parse("https://site.example/a")?).await;
//! limiter.acquire(&Url::parse("https://site.example/b")?).await; // waits ~500ms
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

/// Cumulative per-host delay after which a warning is logged.
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Host key used when a URL has no host.
const UNKNOWN_HOST: &str = "unknown";

/// Shared per-host rate limiter.
///
/// Wrap in `Arc` and share across tasks. The `DashMap` shard lock is released
/// before awaiting on the per-host mutex.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    disabled: bool,
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// `None` until the first request; the first request never waits.
    last_request: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}

impl RateLimiter {
    /// Creates a limiter enforcing `interval` between requests to one host.
    ///
    /// A zero interval yields a disabled limiter.
    #[must_use]
    #[instrument(skip_all, fields(interval_ms = interval.as_millis()))]
    pub fn new(interval: Duration) -> Self {
        if interval.is_zero() {
            return Self::disabled();
        }
        debug!("creating rate limiter");
        Self {
            interval,
            disabled: false,
            hosts: DashMap::new(),
        }
    }

    /// Creates a limiter that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            interval: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Returns whether throttling is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the minimum interval between requests to one host.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request to `url`'s host is allowed, then records it.
    #[instrument(level = "trace", skip(self, url), fields(host = tracing::field::Empty))]
    pub async fn acquire(&self, url: &Url) {
        if self.disabled {
            return;
        }

        let host = host_key(url);
        tracing::Span::current().record("host", host.as_str());

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut last_request = state.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let delay = self.interval.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);
                debug!(
                    host = %host,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "throttling request"
                );
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "heavy throttling; consider fetching fewer pages at once"
                    );
                }
                tokio::time::sleep(delay).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

fn host_key(url: &Url) -> String {
    url.host_str()
        .map_or_else(|| UNKNOWN_HOST.to_string(), str::to_ascii_lowercase)
}
