//! Request failure taxonomy for the fetch pipeline.

use thiserror::Error;

use crate::auth::AuthError;

/// Errors surfaced to callers of the authenticating pipeline.
///
/// Authentication failures are kept apart from transport failures so callers
/// can report "authentication failed" instead of a generic network error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The transport timed out.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The final response had a non-success status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// A URL could not be built or parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// Logging in to refresh the session failed.
    #[error("[AUTH] authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// The request body is a stream and cannot be sent a second time.
    #[error("request to {url} cannot be replayed after re-login (streaming body)")]
    NotReplayable {
        /// The request URL.
        url: String,
    },

    /// A page was fetched but its markup did not contain the expected content.
    #[error("failed to parse {url}: {reason}")]
    Parse {
        /// The page URL.
        url: String,
        /// What was missing.
        reason: String,
    },
}

impl FetchError {
    /// Classifies a transport error as [`FetchError::Timeout`] or [`FetchError::Network`].
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for login failures.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Returns the login failure, if this is one.
    #[must_use]
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            Self::Authentication(error) => Some(error),
            _ => None,
        }
    }
}

// No `From<reqwest::Error>`: every transport failure needs the URL for
// context, so callers go through `FetchError::transport`.
