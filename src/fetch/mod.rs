//! Outbound HTTP: transport, per-host rate limiting, and the authenticating pipeline.
//!
//! # Layers
//!
//! - [`Transport`] executes a single request. [`HttpTransport`] wraps a pooled
//!   `reqwest::Client` behind a shared [`RateLimiter`].
//! - [`AuthenticatingClient`] wraps every request with session reuse, failure
//!   detection, one re-login and one retry.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zerobyw_core::auth::CredentialStore;
//! use zerobyw_core::fetch::{AuthenticatingClient, HttpTransport, TransportSettings};
//! use zerobyw_core::prefs::MemoryPreferences;
//! use zerobyw_core::Endpoint;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Endpoint::parse("https://www.zerobyw.example")?;
//! let store = Arc::new(CredentialStore::open(Arc::new(MemoryPreferences::new()), endpoint).await);
//! let transport = Arc::new(HttpTransport::new(&TransportSettings::default())?);
//! let client = AuthenticatingClient::new(transport, store);
//! let html = client.get_html(client.store().endpoint().url("index.php")?).await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod pipeline;
pub mod rate_limiter;
mod transport;

pub use error::FetchError;
pub use pipeline::{AuthenticatingClient, SessionInvalidation};
pub use rate_limiter::RateLimiter;
pub use transport::{HttpTransport, Transport, TransportSettings};
