//! Durable string key-value substrate for credentials and session cookies.
//!
//! [`PreferenceStore`] is the seam: production code uses [`SqlitePreferences`]
//! so sessions survive restarts; tests and throwaway runs use
//! [`MemoryPreferences`]. Each operation is a single atomic write.

use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::instrument;

use crate::db::Database;

/// Key holding the serialized session cookie header.
pub const COOKIES_KEY: &str = "cookies";
/// Key holding the forum username.
pub const USERNAME_KEY: &str = "username";
/// Key holding the forum password.
pub const PASSWORD_KEY: &str = "password";
/// Key holding the last resolved base URL.
pub const BASE_URL_KEY: &str = "base_url";

/// Errors from the persistent preference substrate.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The backing database rejected the operation.
    #[error("preference storage failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// String-keyed durable storage.
#[async_trait]
pub trait PreferenceStore: Send + Sync + fmt::Debug {
    /// Reads a value, `None` when the key is unset.
    async fn get_string(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    /// Inserts or replaces a value.
    async fn put_string(&self, key: &str, value: &str) -> Result<(), PreferenceError>;

    /// Removes a key. Removing an unset key is not an error.
    async fn remove(&self, key: &str) -> Result<(), PreferenceError>;
}

/// Process-local preferences, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: DashMap<String, String>,
}

impl MemoryPreferences {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { values }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get_string(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.get(key).map(|entry| entry.value().clone()))
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Preferences persisted in the SQLite `preferences` table.
#[derive(Debug, Clone)]
pub struct SqlitePreferences {
    db: Database,
}

impl SqlitePreferences {
    /// Wraps an opened, migrated database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferences {
    #[instrument(level = "trace", skip(self))]
    async fn get_string(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|(value,)| value))
    }

    #[instrument(level = "trace", skip(self, value))]
    async fn put_string(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(key)
        .bind(value)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    async fn remove(&self, key: &str) -> Result<(), PreferenceError> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
