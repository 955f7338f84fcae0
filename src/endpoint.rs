//! Resolved base URL for all requests to the site.

use std::fmt;

use url::Url;

use crate::config::ConfigError;

/// Absolute http(s) base URL that request paths are joined onto.
///
/// The base path always ends with `/`, so joining `member.php` onto
/// `https://host/forum` yields `https://host/forum/member.php` instead of
/// replacing the last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// Parses and normalizes a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] when the value is not an
    /// absolute `http`/`https` URL with a host.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let mut base = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self { base })
    }

    /// Builds an absolute URL for a site-relative path (query allowed).
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error when `path` cannot be joined.
    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path.trim_start_matches('/'))
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the base URL without the trailing slash, as users write it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse_adds_trailing_slash() {
        let endpoint = Endpoint::parse("https://www.zerobyw.example").unwrap();
        assert_eq!(endpoint.base().as_str(), "https://www.zerobyw.example/");
        assert_eq!(endpoint.as_str(), "https://www.zerobyw.example");
    }

    #[test]
    fn test_endpoint_url_joins_below_base_path() {
        let endpoint = Endpoint::parse("https://host.example/forum").unwrap();
        let url = endpoint
            .url("/member.php?mod=logging&action=login")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://host.example/forum/member.php?mod=logging&action=login"
        );
    }

    #[test]
    fn test_endpoint_parse_drops_query_and_fragment() {
        let endpoint = Endpoint::parse("http://127.0.0.1:8080/?x=1#top").unwrap();
        assert_eq!(endpoint.as_str(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_endpoint_parse_rejects_non_http_scheme() {
        let err = Endpoint::parse("ftp://host.example").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_endpoint_parse_rejects_relative_value() {
        assert!(Endpoint::parse("www.zerobyw.example").is_err());
        assert!(Endpoint::parse("").is_err());
    }
}
