//! Login failure taxonomy.

use thiserror::Error;

/// Reasons a login attempt can fail.
///
/// Transport failures (DNS, refused connections, timeouts) are not part of
/// this type; they surface as plain request failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is absent or blank. Raised before any network call.
    #[error("username or password not set")]
    MissingCredentials,

    /// The login page carried no `<form method=post>`; the site layout likely changed.
    #[error("login form not found at {url}")]
    FormNotFound {
        /// The login page URL that was fetched.
        url: String,
    },

    /// The credential submission returned a non-success status.
    #[error("login submission to {url} failed with HTTP {status}")]
    SubmitFailed {
        /// The form submission target.
        url: String,
        /// HTTP status returned by the site.
        status: u16,
    },

    /// The submission succeeded but no `Set-Cookie` header issued a session.
    #[error("login to {url} issued no session cookies (check username and password)")]
    NoSessionIssued {
        /// The form submission target.
        url: String,
    },
}
