//! File configuration and endpoint resolution.
//!
//! The config file uses simple `key = value` lines with `#` comments:
//!
//! ```toml
//! base_url = "https://www.zerobyw.example"
//! username = "reader"
//! password = "secret"
//! rate_limit = 500
//! invalidate_on = "auth"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::fetch::SessionInvalidation;
use crate::prefs::{BASE_URL_KEY, PreferenceStore};

const APP_DIR: &str = "zerobyw";
const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "zerobyw.db";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base URL '{value}': {reason}")]
    InvalidBaseUrl {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No base URL was configured and none was persisted.
    #[error("no base URL configured; pass --base-url, set ZEROBYW_BASE_URL, or add base_url to the config file")]
    MissingBaseUrl,

    /// A line is not `key = value`.
    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax {
        /// 1-based line number.
        line: usize,
    },

    /// A known key has an unusable value.
    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        /// The config key.
        key: String,
        /// 1-based line number (0 when produced by validation).
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// The key is not recognized.
    #[error("unknown config key `{key}` on line {line}")]
    UnknownKey {
        /// The unrecognized key.
        key: String,
        /// 1-based line number.
        line: usize,
    },

    /// Reading the config file failed.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// The config file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Values read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Site base URL.
    pub base_url: Option<String>,
    /// Forum username.
    pub username: Option<String>,
    /// Forum password.
    pub password: Option<String>,
    /// SQLite preference database path.
    pub database: Option<PathBuf>,
    /// Minimum spacing between requests to one host, in milliseconds.
    pub rate_limit: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Which failures invalidate the stored session.
    pub invalidate_on: Option<SessionInvalidation>,
}

impl FileConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rate_limit) = self.rate_limit
            && rate_limit > 60_000
        {
            return Err(range_error("rate_limit", rate_limit, "0..=60000"));
        }
        validate_timeout("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(base_url) = &self.base_url {
            Endpoint::parse(base_url)?;
        }
        Ok(())
    }
}

fn validate_timeout(key: &str, value: Option<u64>) -> Result<(), ConfigError> {
    match value {
        Some(value) if !(1..=3600).contains(&value) => Err(range_error(key, value, "1..=3600")),
        _ => Ok(()),
    }
}

fn range_error(key: &str, value: u64, range: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        line: 0,
        reason: format!("{value} is outside the expected range {range}"),
    }
}

/// Config file location: `$XDG_CONFIG_HOME/zerobyw/config.toml`, else
/// `$HOME/.config/zerobyw/config.toml`.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Preference database location: `$XDG_DATA_HOME/zerobyw/zerobyw.db`, else
/// `$HOME/.local/share/zerobyw/zerobyw.db`.
#[must_use]
pub fn resolve_default_database_path() -> Option<PathBuf> {
    if let Some(data_home) = env_var_non_empty("XDG_DATA_HOME") {
        return Some(PathBuf::from(data_home).join(APP_DIR).join(DATABASE_FILE_NAME));
    }
    let home = env_var_non_empty("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join(DATABASE_FILE_NAME),
    )
}

fn config_dir() -> Option<PathBuf> {
    if let Some(config_home) = env_var_non_empty("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(config_home).join(APP_DIR));
    }
    let home = env_var_non_empty("HOME")?;
    Some(PathBuf::from(home).join(".config").join(APP_DIR))
}

fn env_var_non_empty(name: &str) -> Option<std::ffi::OsString> {
    env::var_os(name).filter(|value| !value.is_empty())
}

/// Loads `path` when it exists; a missing file yields defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or validated.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(FileConfig::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config_str(&raw)?;
    config.validate()?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parses config text.
///
/// # Errors
///
/// Returns [`ConfigError`] for syntax errors, unknown keys, or bad values.
pub fn parse_config_str(raw: &str) -> Result<FileConfig, ConfigError> {
    let mut cfg = FileConfig::default();
    for (index, raw_line) in raw.lines().enumerate() {
        let line = index + 1;
        let text = strip_inline_comment(raw_line).trim();
        if text.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = text.split_once('=') else {
            return Err(ConfigError::Syntax { line });
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: key.to_string(),
            line,
            reason,
        };

        match key {
            "base_url" => cfg.base_url = Some(parse_string_literal(value).map_err(invalid)?),
            "username" => cfg.username = Some(parse_string_literal(value).map_err(invalid)?),
            "password" => cfg.password = Some(parse_string_literal(value).map_err(invalid)?),
            "database" => {
                cfg.database = Some(PathBuf::from(parse_string_literal(value).map_err(invalid)?));
            }
            "rate_limit" => cfg.rate_limit = Some(parse_integer(value).map_err(invalid)?),
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer(value).map_err(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer(value).map_err(invalid)?);
            }
            "invalidate_on" => {
                let label = parse_string_literal(value).map_err(invalid)?;
                cfg.invalidate_on = Some(label.parse().map_err(invalid)?);
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                    line,
                });
            }
        }
    }
    Ok(cfg)
}

/// Drops a `#` comment that is not inside a double-quoted string.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match ch {
            '\\' if in_string && !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
        escaped = false;
    }
    line
}

fn parse_string_literal(value: &str) -> Result<String, String> {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return Err(format!("expected a double-quoted string, got {value}"));
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(format!("unsupported escape \\{other}")),
            None => return Err("dangling escape at end of string".to_string()),
        }
    }
    Ok(out)
}

fn parse_integer(value: &str) -> Result<u64, String> {
    value
        .replace('_', "")
        .parse()
        .map_err(|_| format!("expected a non-negative integer, got {value}"))
}

/// Resolves the endpoint once per process.
///
/// An explicit value wins and is persisted under `base_url` for later runs;
/// otherwise the persisted value is used.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] for an unusable value and
/// [`ConfigError::MissingBaseUrl`] when neither source has one.
pub async fn resolve_endpoint(
    explicit: Option<&str>,
    preferences: &dyn PreferenceStore,
) -> Result<Endpoint, ConfigError> {
    if let Some(raw) = explicit.filter(|raw| !raw.trim().is_empty()) {
        let endpoint = Endpoint::parse(raw)?;
        if let Err(error) = preferences.put_string(BASE_URL_KEY, endpoint.as_str()).await {
            warn!(error = %error, "failed to persist base URL");
        }
        return Ok(endpoint);
    }

    match preferences.get_string(BASE_URL_KEY).await {
        Ok(Some(raw)) => Endpoint::parse(&raw),
        Ok(None) => Err(ConfigError::MissingBaseUrl),
        Err(error) => {
            warn!(error = %error, "failed to read persisted base URL");
            Err(ConfigError::MissingBaseUrl)
        }
    }
}
