//! Zerobyw Core Library
//!
//! Client for a Discuz-based manga forum whose content is only visible to
//! logged-in members. Every page request goes through an authenticating
//! pipeline that attaches the stored session cookie, detects rejection, and
//! transparently logs in again with the stored credentials.
//!
//! # Architecture
//!
//! - [`auth`] - Credentials, session cookies, the credential store, and the site login flow
//! - [`fetch`] - HTTP transport, per-host rate limiting, and the authenticating pipeline
//! - [`source`] - Catalog listing, manga detail, and chapter page extraction
//! - [`prefs`] - Persistent key/value preferences (in-memory or SQLite)
//! - [`config`] - Config file parsing and endpoint resolution
//! - [`db`] - SQLite connection and migrations

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod fetch;
pub mod prefs;
pub mod source;
mod user_agent;

// Re-export commonly used types
pub use auth::{AuthError, CredentialStore, Credentials, Session, SiteLoginClient};
pub use config::{ConfigError, FileConfig};
pub use db::{Database, DbError};
pub use endpoint::Endpoint;
pub use fetch::{
    AuthenticatingClient, FetchError, HttpTransport, RateLimiter, SessionInvalidation, Transport,
    TransportSettings,
};
pub use prefs::{MemoryPreferences, PreferenceError, PreferenceStore, SqlitePreferences};
pub use source::{ChapterRef, ForumSource, MangaDetail, MangaSummary, PageImage};
pub use user_agent::BROWSER_USER_AGENT;
