//! Authenticating request pipeline.
//!
//! Every request goes through the same bounded state machine:
//!
//! 1. With a stored session, attach it and send. Success returns directly.
//! 2. On failure, drop the response and invalidate that session. With
//!    complete credentials, log in once and send once more; the outcome of
//!    that second attempt is returned whatever its status.
//! 3. Without credentials, send without a `Cookie` header and return the
//!    result unmodified.
//!
//! A request costs at most two executions plus one login (itself at most two
//! requests). Logins are serialized behind a gate: a task that finds a fresh
//! session stored by a concurrent login reuses it instead of logging in again.

use std::str::FromStr;
use std::sync::Arc;

use reqwest::header::COOKIE;
use reqwest::{Method, Request, Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{FetchError, Transport};
use crate::auth::{AuthError, CredentialStore, Credentials, Session, SiteLoginClient};

/// Which failed responses invalidate the attached session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionInvalidation {
    /// Any non-success status (the site's historical behavior).
    #[default]
    AnyFailure,
    /// Only 401 and 403. Other failures are returned with the session kept
    /// and without a retry.
    AuthFailuresOnly,
}

impl SessionInvalidation {
    /// Returns whether a response with `status` invalidates the session.
    #[must_use]
    pub fn should_invalidate(self, status: StatusCode) -> bool {
        match self {
            Self::AnyFailure => !status.is_success(),
            Self::AuthFailuresOnly => {
                matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            }
        }
    }

    /// Stable config label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnyFailure => "any",
            Self::AuthFailuresOnly => "auth",
        }
    }
}

impl FromStr for SessionInvalidation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::AnyFailure),
            "auth" => Ok(Self::AuthFailuresOnly),
            other => Err(format!("expected \"any\" or \"auth\", got \"{other}\"")),
        }
    }
}

/// HTTP client that keeps requests authenticated.
///
/// Cheap to clone; clones share the transport, credential store, and login gate.
#[derive(Debug, Clone)]
pub struct AuthenticatingClient {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    login: SiteLoginClient,
    login_gate: Arc<Mutex<()>>,
    invalidation: SessionInvalidation,
}

impl AuthenticatingClient {
    /// Creates a pipeline over `transport` using the credentials in `store`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        let login = SiteLoginClient::new(Arc::clone(&transport), Arc::clone(&store));
        Self {
            transport,
            store,
            login,
            login_gate: Arc::new(Mutex::new(())),
            invalidation: SessionInvalidation::default(),
        }
    }

    /// Sets which failures invalidate the stored session.
    #[must_use]
    pub fn with_invalidation(mut self, invalidation: SessionInvalidation) -> Self {
        self.invalidation = invalidation;
        self
    }

    /// Returns the shared credential store.
    #[must_use]
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Returns the active invalidation policy.
    #[must_use]
    pub fn invalidation(&self) -> SessionInvalidation {
        self.invalidation
    }

    /// Executes `request` with session handling.
    ///
    /// Any `Cookie` header set by the caller is replaced by the stored session,
    /// or removed when the request goes out unauthenticated.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Authentication`] when a needed re-login fails
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] for transport failures
    /// - [`FetchError::NotReplayable`] when a session is attached and the body
    ///   cannot be cloned for a possible retry
    ///
    /// Non-success statuses are not errors here; the response is returned.
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: Request) -> Result<Response, FetchError> {
        let credentials = self.store.credentials().await;
        let mut stale = None;

        if let Some(session) = self.store.session().await {
            let attempt = request.try_clone().ok_or_else(|| FetchError::NotReplayable {
                url: request.url().to_string(),
            })?;
            let response = self.send(attempt, Some(&session)).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if !self.invalidation.should_invalidate(status) {
                debug!(
                    status = status.as_u16(),
                    "request failed with session attached; keeping session"
                );
                return Ok(response);
            }
            drop(response);

            if self.store.invalidate_session(&session).await {
                warn!(status = status.as_u16(), "session rejected; cleared stored cookies");
            }
            stale = Some(session);
        }

        if credentials.is_complete() {
            match self.refresh_session(&credentials, stale.as_ref()).await {
                Ok(session) => return self.send(request, Some(&session)).await,
                Err(FetchError::Authentication(AuthError::MissingCredentials)) => {
                    debug!("credentials unavailable at login time; continuing unauthenticated");
                }
                Err(error) => return Err(error),
            }
        }

        debug!("sending request unauthenticated");
        self.send(request, None).await
    }

    /// Sends a GET for `url`.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub async fn get(&self, url: Url) -> Result<Response, FetchError> {
        self.execute(Request::new(Method::GET, url)).await
    }

    /// Sends a GET and returns the body of a successful response.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), plus [`FetchError::HttpStatus`]
    /// when the final response is not a success.
    pub async fn get_html(&self, url: Url) -> Result<String, FetchError> {
        let response = self.get(url.clone()).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| FetchError::transport(url.as_str(), e))
    }

    /// Forces a fresh login with the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns the login failure, [`AuthError::MissingCredentials`] included.
    pub async fn login(&self) -> Result<Session, FetchError> {
        let credentials = self.store.credentials().await;
        let _gate = self.login_gate.lock().await;
        self.login.login(self.store.endpoint(), &credentials).await
    }

    /// Drops the stored session.
    pub async fn logout(&self) {
        self.store.clear_session().await;
    }

    /// Returns a session for a retry, logging in at most once.
    async fn refresh_session(
        &self,
        credentials: &Credentials,
        stale: Option<&Session>,
    ) -> Result<Session, FetchError> {
        let _gate = self.login_gate.lock().await;

        if let Some(current) = self.store.session().await
            && stale != Some(&current)
        {
            debug!("reusing session from a concurrent login");
            return Ok(current);
        }

        self.login.login(self.store.endpoint(), credentials).await
    }

    async fn send(&self, mut request: Request, session: Option<&Session>) -> Result<Response, FetchError> {
        let url = request.url().to_string();
        match session {
            Some(session) => {
                request.headers_mut().insert(COOKIE, session.header_value());
            }
            None => {
                request.headers_mut().remove(COOKIE);
            }
        }
        self.transport
            .execute(request)
            .await
            .map_err(|e| FetchError::transport(url, e))
    }
}
