//! Credential and session value types.
//!
//! Both types hold secrets, so their `Debug` output is redacted to keep
//! passwords and cookie values out of logs.

use std::fmt;

use reqwest::header::HeaderValue;

/// Username/password pair configured by the user.
///
/// Either field may be absent; requests then run unauthenticated.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Forum account name.
    pub username: Option<String>,
    /// Forum account password (sensitive, never log).
    pub password: Option<String>,
}

impl Credentials {
    /// Creates credentials from optional parts.
    #[must_use]
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    /// Returns `true` when both username and password are present and not blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pair().is_some()
    }

    /// Returns the username/password pair when both are usable.
    pub(crate) fn pair(&self) -> Option<(&str, &str)> {
        let username = non_blank(self.username.as_deref())?;
        let password = non_blank(self.password.as_deref())?;
        Some((username, password))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// An authenticated session: one `Cookie` header value such as `a=1; b=2`.
///
/// A session is never empty. Construction trims the value and rejects empty
/// strings and values that are not legal header values, so a stored session
/// can always be attached to a request.
#[derive(Clone)]
pub struct Session {
    cookie_header: String,
    header: HeaderValue,
}

impl Session {
    /// Builds a session from a serialized cookie header.
    ///
    /// Returns `None` for blank input or characters not allowed in headers.
    #[must_use]
    pub fn new(cookie_header: impl Into<String>) -> Option<Self> {
        let cookie_header = cookie_header.into().trim().to_string();
        if cookie_header.is_empty() {
            return None;
        }

        let mut header = HeaderValue::from_str(&cookie_header).ok()?;
        header.set_sensitive(true);
        Some(Self {
            cookie_header,
            header,
        })
    }

    /// Returns the serialized cookie header (sensitive, avoid logging).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.cookie_header
    }

    /// Returns the header value to attach as `Cookie`, flagged sensitive.
    #[must_use]
    pub fn header_value(&self) -> HeaderValue {
        self.header.clone()
    }

    /// Number of `name=value` pairs carried by the session.
    #[must_use]
    pub fn cookie_count(&self) -> usize {
        self.cookie_header
            .split(';')
            .filter(|part| !part.trim().is_empty())
            .count()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.cookie_header == other.cookie_header
    }
}

impl Eq for Session {}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("cookies", &self.cookie_count())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_complete_requires_both_non_blank() {
        let complete = Credentials::new(Some("user".into()), Some("pass".into()));
        assert!(complete.is_complete());

        assert!(!Credentials::default().is_complete());
        assert!(!Credentials::new(Some("user".into()), None).is_complete());
        assert!(!Credentials::new(None, Some("pass".into())).is_complete());
        assert!(!Credentials::new(Some("   ".into()), Some("pass".into())).is_complete());
        assert!(!Credentials::new(Some("user".into()), Some(String::new())).is_complete());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new(Some("user".into()), Some("hunter2".into()));
        let debug = format!("{credentials:?}");
        assert!(debug.contains("user"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"), "password leaked: {debug}");
    }

    #[test]
    fn test_session_rejects_blank_values() {
        assert!(Session::new("").is_none());
        assert!(Session::new("   ").is_none());
    }

    #[test]
    fn test_session_rejects_illegal_header_characters() {
        assert!(Session::new("a=1\nb=2").is_none());
    }

    #[test]
    fn test_session_trims_and_counts_cookies() {
        let session = Session::new("  a=1; b=2 ").unwrap();
        assert_eq!(session.as_str(), "a=1; b=2");
        assert_eq!(session.cookie_count(), 2);
        assert!(session.header_value().is_sensitive());
    }

    #[test]
    fn test_session_debug_redacts_value() {
        let session = Session::new("auth=super_secret").unwrap();
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super_secret"), "cookie leaked: {debug}");
    }
}
