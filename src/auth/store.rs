//! Shared owner of credentials, the cached session, and the endpoint.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{Credentials, Session};
use crate::endpoint::Endpoint;
use crate::prefs::{COOKIES_KEY, PASSWORD_KEY, PreferenceStore, USERNAME_KEY};

/// Write-through cache over a [`PreferenceStore`].
///
/// Every mutation updates memory and the persistent store while holding the
/// write lock, so concurrent readers never observe a partial value and the
/// persisted order matches the in-memory order. Persistence failures are
/// logged; the in-memory value stays authoritative for this process.
#[derive(Debug)]
pub struct CredentialStore {
    endpoint: Endpoint,
    preferences: Arc<dyn PreferenceStore>,
    state: RwLock<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    credentials: Credentials,
    session: Option<Session>,
}

impl CredentialStore {
    /// Loads persisted credentials and session for `endpoint`.
    ///
    /// Unreadable entries are treated as absent. A persisted session that is
    /// blank is ignored.
    #[instrument(skip(preferences), fields(endpoint = %endpoint))]
    pub async fn open(preferences: Arc<dyn PreferenceStore>, endpoint: Endpoint) -> Self {
        let username = load(preferences.as_ref(), USERNAME_KEY).await;
        let password = load(preferences.as_ref(), PASSWORD_KEY).await;
        let session = load(preferences.as_ref(), COOKIES_KEY)
            .await
            .and_then(Session::new);

        debug!(
            has_username = username.is_some(),
            has_password = password.is_some(),
            has_session = session.is_some(),
            "loaded credential store"
        );

        Self {
            endpoint,
            preferences,
            state: RwLock::new(StoreState {
                credentials: Credentials::new(username, password),
                session,
            }),
        }
    }

    /// Returns the resolved base endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the current credentials.
    pub async fn credentials(&self) -> Credentials {
        self.state.read().await.credentials.clone()
    }

    /// Returns the cached session, if any.
    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    /// Stores and persists a session, replacing any previous one.
    pub async fn set_session(&self, session: Session) {
        let mut state = self.state.write().await;
        self.persist(COOKIES_KEY, Some(session.as_str())).await;
        state.session = Some(session);
    }

    /// Removes the cached session. Idempotent.
    pub async fn clear_session(&self) {
        let mut state = self.state.write().await;
        if state.session.take().is_some() {
            debug!("cleared stored session");
        }
        self.persist(COOKIES_KEY, None).await;
    }

    /// Removes the cached session only if it still equals `stale`.
    ///
    /// Returns `true` when the session was removed. A session written by a
    /// concurrent login in the meantime is left untouched.
    pub async fn invalidate_session(&self, stale: &Session) -> bool {
        let mut state = self.state.write().await;
        if state.session.as_ref() != Some(stale) {
            return false;
        }
        state.session = None;
        self.persist(COOKIES_KEY, None).await;
        true
    }

    /// Replaces and persists the credentials; drops the current session.
    ///
    /// A `None` field removes the corresponding persisted key.
    #[instrument(skip_all)]
    pub async fn set_credentials(&self, credentials: Credentials) {
        let mut state = self.state.write().await;
        self.persist(USERNAME_KEY, credentials.username.as_deref())
            .await;
        self.persist(PASSWORD_KEY, credentials.password.as_deref())
            .await;
        self.persist(COOKIES_KEY, None).await;
        state.credentials = credentials;
        state.session = None;
        debug!("credentials updated; session reset");
    }

    async fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.preferences.put_string(key, value).await,
            None => self.preferences.remove(key).await,
        };
        if let Err(error) = result {
            warn!(key, error = %error, "failed to persist preference; keeping in-memory value");
        }
    }
}

async fn load(preferences: &dyn PreferenceStore, key: &str) -> Option<String> {
    match preferences.get_string(key).await {
        Ok(value) => value,
        Err(error) => {
            warn!(key, error = %error, "failed to read preference; treating as unset");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::prefs::{MemoryPreferences, PreferenceError};

    fn endpoint() -> Endpoint {
        Endpoint::parse("https://site.example").unwrap()
    }

    fn session(value: &str) -> Session {
        Session::new(value).unwrap()
    }

    #[derive(Debug)]
    struct BrokenPreferences;

    #[async_trait]
    impl PreferenceStore for BrokenPreferences {
        async fn get_string(&self, _key: &str) -> Result<Option<String>, PreferenceError> {
            Err(PreferenceError::Database(sqlx::Error::PoolClosed))
        }

        async fn put_string(&self, _key: &str, _value: &str) -> Result<(), PreferenceError> {
            Err(PreferenceError::Database(sqlx::Error::PoolClosed))
        }

        async fn remove(&self, _key: &str) -> Result<(), PreferenceError> {
            Err(PreferenceError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn test_open_loads_persisted_state() {
        let prefs = Arc::new(MemoryPreferences::with_entries([
            (USERNAME_KEY, "user"),
            (PASSWORD_KEY, "pass"),
            (COOKIES_KEY, "sid=abc"),
        ]));
        let store = CredentialStore::open(prefs, endpoint()).await;

        assert!(store.credentials().await.is_complete());
        assert_eq!(store.session().await, Some(session("sid=abc")));
    }

    #[tokio::test]
    async fn test_open_treats_blank_cookie_as_absent() {
        let prefs = Arc::new(MemoryPreferences::with_entries([(COOKIES_KEY, "  ")]));
        let store = CredentialStore::open(prefs, endpoint()).await;
        assert_eq!(store.session().await, None);
    }

    #[tokio::test]
    async fn test_set_and_clear_session_write_through() {
        let prefs = Arc::new(MemoryPreferences::new());
        let store = CredentialStore::open(prefs.clone(), endpoint()).await;

        store.set_session(session("a=1; b=2")).await;
        assert_eq!(
            prefs.get_string(COOKIES_KEY).await.unwrap().as_deref(),
            Some("a=1; b=2")
        );

        store.clear_session().await;
        store.clear_session().await;
        assert_eq!(store.session().await, None);
        assert_eq!(prefs.get_string(COOKIES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_session_only_removes_matching_value() {
        let prefs = Arc::new(MemoryPreferences::new());
        let store = CredentialStore::open(prefs.clone(), endpoint()).await;

        store.set_session(session("sid=new")).await;
        assert!(!store.invalidate_session(&session("sid=old")).await);
        assert_eq!(store.session().await, Some(session("sid=new")));

        assert!(store.invalidate_session(&session("sid=new")).await);
        assert_eq!(store.session().await, None);
        assert_eq!(prefs.get_string(COOKIES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_credentials_persists_and_resets_session() {
        let prefs = Arc::new(MemoryPreferences::with_entries([
            (USERNAME_KEY, "old"),
            (PASSWORD_KEY, "old-pass"),
            (COOKIES_KEY, "sid=abc"),
        ]));
        let store = CredentialStore::open(prefs.clone(), endpoint()).await;

        store
            .set_credentials(Credentials::new(Some("new".into()), None))
            .await;

        assert_eq!(store.session().await, None);
        assert_eq!(
            prefs.get_string(USERNAME_KEY).await.unwrap().as_deref(),
            Some("new")
        );
        assert_eq!(prefs.get_string(PASSWORD_KEY).await.unwrap(), None);
        assert_eq!(prefs.get_string(COOKIES_KEY).await.unwrap(), None);
        assert!(!store.credentials().await.is_complete());
    }

    #[tokio::test]
    async fn test_broken_persistence_keeps_in_memory_state() {
        let store = CredentialStore::open(Arc::new(BrokenPreferences), endpoint()).await;
        assert_eq!(store.session().await, None);

        store.set_session(session("sid=abc")).await;
        assert_eq!(store.session().await, Some(session("sid=abc")));
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_tear_session() {
        let store = Arc::new(CredentialStore::open(Arc::new(MemoryPreferences::new()), endpoint()).await);
        let candidates = ["a=1; b=2", "c=3; d=4", "e=5; f=6"];

        let mut handles = Vec::new();
        for value in candidates {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.set_session(Session::new(value).unwrap()).await;
                    let seen = store.session().await;
                    assert!(seen.is_some_and(|s| candidates.contains(&s.as_str())));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
