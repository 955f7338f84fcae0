//! Shared User-Agent string for all site traffic.
//!
//! Login and catalog requests must present the same browser identity; the
//! forum ties sessions to the agent that created them.

/// Browser User-Agent sent with every request (login handshake included).
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0";

/// Returns the User-Agent used for site traffic.
#[must_use]
pub(crate) fn default_site_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}
