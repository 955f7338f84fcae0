//! Username/password login handshake against the forum's login form.
//!
//! The login page embeds anti-forgery and continuity tokens as hidden inputs.
//! Every named input is submitted back unchanged together with the
//! credentials, so the handshake keeps working when those tokens change.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, SET_COOKIE};
use reqwest::{Method, Request};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;
use url::form_urlencoded;

use super::{AuthError, CredentialStore, Credentials, Session};
use crate::endpoint::Endpoint;
use crate::fetch::{FetchError, Transport};

/// Site-relative path of the login page.
pub const LOGIN_PAGE_PATH: &str = "member.php?mod=logging&action=login";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Login form extracted from the login page.
///
/// Fields keep page order. [`LoginForm::set`] overwrites an existing field in
/// place and appends new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    submit_url: Url,
    fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Parses the first POST form of `html`.
    ///
    /// The submission target is the form `action` resolved against `page_url`,
    /// or `page_url` itself when the action is absent, blank, or unresolvable.
    /// Returns `None` when the page has no POST form.
    #[must_use]
    pub fn parse(html: &str, page_url: &Url) -> Option<Self> {
        let document = Html::parse_document(html);
        let form_selector = Selector::parse("form").ok()?;
        let input_selector = Selector::parse("input").ok()?;

        let form = document.select(&form_selector).find(|form| {
            form.value()
                .attr("method")
                .is_some_and(|method| method.trim().eq_ignore_ascii_case("post"))
        })?;

        let submit_url = form
            .value()
            .attr("action")
            .map(str::trim)
            .filter(|action| !action.is_empty())
            .and_then(|action| page_url.join(action).ok())
            .unwrap_or_else(|| page_url.clone());

        let mut login_form = Self {
            submit_url,
            fields: Vec::new(),
        };
        for input in form.select(&input_selector) {
            let Some(name) = input.value().attr("name").filter(|n| !n.trim().is_empty()) else {
                continue;
            };
            login_form.set(name, input.value().attr("value").unwrap_or_default());
        }

        Some(login_form)
    }

    /// Sets a field, replacing the value of an existing field of the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        if let Some(field) = self.fields.iter_mut().find(|(n, _)| n == name) {
            field.1 = value.to_string();
        } else {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }

    /// Returns the absolute submission target.
    #[must_use]
    pub fn submit_url(&self) -> &Url {
        &self.submit_url
    }

    /// Returns the fields in submission order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Looks up a field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encodes the fields as an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

/// Builds a session from the `Set-Cookie` headers of a response.
///
/// Each header contributes the `name=value` part before its first `;`;
/// attributes such as `Path` or `HttpOnly` are dropped. Parts are joined with
/// `"; "`. Values that are not visible ASCII cannot be sent back in a
/// `Cookie` header and are skipped. Returns `None` when no usable cookie was
/// issued.
#[must_use]
pub fn session_from_set_cookie(headers: &HeaderMap) -> Option<Session> {
    let mut pairs = Vec::new();
    let mut skipped = 0usize;
    for value in headers.get_all(SET_COOKIE).iter() {
        let Ok(value) = value.to_str() else {
            skipped += 1;
            continue;
        };
        if let Some(pair) = value.split(';').next().map(str::trim)
            && !pair.is_empty()
        {
            pairs.push(pair);
        }
    }
    if skipped > 0 {
        debug!(
            skipped,
            kept = pairs.len(),
            "ignored Set-Cookie values with non-ASCII bytes"
        );
    }

    Session::new(pairs.join("; "))
}

/// Performs the login handshake over the raw transport.
///
/// Login traffic deliberately bypasses the authenticating pipeline so a login
/// can never trigger another login.
#[derive(Debug, Clone)]
pub struct SiteLoginClient {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
}

impl SiteLoginClient {
    /// Creates a login client that persists issued sessions into `store`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        Self { transport, store }
    }

    /// Logs in and persists the issued session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredentials`] before any network call when the
    ///   username or password is absent or blank
    /// - [`AuthError::FormNotFound`] when the login page has no POST form
    /// - [`AuthError::SubmitFailed`] when the submission returns non-success
    /// - [`AuthError::NoSessionIssued`] when no `Set-Cookie` came back; the
    ///   stored session is left unchanged
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] for transport failures
    #[instrument(skip(self, credentials), fields(endpoint = %endpoint))]
    pub async fn login(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Session, FetchError> {
        let Some((username, password)) = credentials.pair() else {
            return Err(AuthError::MissingCredentials.into());
        };

        let page_url = endpoint
            .url(LOGIN_PAGE_PATH)
            .map_err(|_| FetchError::invalid_url(format!("{endpoint}/{LOGIN_PAGE_PATH}")))?;

        let page = self
            .transport
            .execute(Request::new(Method::GET, page_url.clone()))
            .await
            .map_err(|e| FetchError::transport(page_url.as_str(), e))?;
        if !page.status().is_success() {
            warn!(
                status = page.status().as_u16(),
                "login page returned non-success status; parsing body anyway"
            );
        }
        let body = page
            .text()
            .await
            .map_err(|e| FetchError::transport(page_url.as_str(), e))?;

        let mut form = LoginForm::parse(&body, &page_url).ok_or_else(|| AuthError::FormNotFound {
            url: page_url.to_string(),
        })?;
        form.set("username", username);
        form.set("password", password);
        form.set("loginsubmit", "true");

        let submit_url = form.submit_url().clone();
        debug!(
            submit_url = %submit_url,
            fields = form.fields().len(),
            "submitting login form"
        );

        let mut request = Request::new(Method::POST, submit_url.clone());
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
        *request.body_mut() = Some(form.encode().into());

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| FetchError::transport(submit_url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::SubmitFailed {
                url: submit_url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let session =
            session_from_set_cookie(response.headers()).ok_or_else(|| AuthError::NoSessionIssued {
                url: submit_url.to_string(),
            })?;

        self.store.set_session(session.clone()).await;
        info!(cookies = session.cookie_count(), "login succeeded; session stored");
        Ok(session)
    }
}
