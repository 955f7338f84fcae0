//! A mock forum and a pipeline wired against it.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zerobyw_core::prefs::{COOKIES_KEY, PASSWORD_KEY, USERNAME_KEY};
use zerobyw_core::{
    AuthenticatingClient, CredentialStore, Endpoint, HttpTransport, MemoryPreferences, Transport,
    TransportSettings,
};

/// Login page with a hidden token and a POST form aimed at `/login.php`.
pub const LOGIN_PAGE: &str = r#"<html><body>
<form method="post" action="/login.php">
  <input type="hidden" name="token" value="xyz"/>
</form>
</body></html>"#;

pub struct Forum {
    pub client: AuthenticatingClient,
    pub store: Arc<CredentialStore>,
    pub preferences: Arc<MemoryPreferences>,
}

/// Transport without throttling and with a configurable request timeout.
pub fn transport(read_timeout: Duration) -> Arc<dyn Transport> {
    let settings = TransportSettings {
        connect_timeout: Duration::from_secs(2),
        read_timeout,
        rate_limit: Duration::ZERO,
    };
    Arc::new(HttpTransport::new(&settings).unwrap())
}

/// Builds a pipeline for `server` with optional stored credentials and session.
pub async fn forum(
    server: &MockServer,
    credentials: Option<(&str, &str)>,
    session: Option<&str>,
) -> Forum {
    forum_with_timeout(server, credentials, session, Duration::from_secs(5)).await
}

pub async fn forum_with_timeout(
    server: &MockServer,
    credentials: Option<(&str, &str)>,
    session: Option<&str>,
    read_timeout: Duration,
) -> Forum {
    let mut entries = Vec::new();
    if let Some((username, password)) = credentials {
        entries.push((USERNAME_KEY, username));
        entries.push((PASSWORD_KEY, password));
    }
    if let Some(session) = session {
        entries.push((COOKIES_KEY, session));
    }
    let preferences = Arc::new(MemoryPreferences::with_entries(entries));
    let endpoint = Endpoint::parse(&server.uri()).unwrap();
    let store = Arc::new(CredentialStore::open(preferences.clone(), endpoint).await);
    let client = AuthenticatingClient::new(transport(read_timeout), Arc::clone(&store));
    Forum {
        client,
        store,
        preferences,
    }
}

/// Mounts the login page and a submission that issues `cookie`.
pub async fn mount_login(server: &MockServer, cookie: &str, expected_logins: u64) {
    Mock::given(method("GET"))
        .and(path("/member.php"))
        .and(query_param("mod", "logging"))
        .and(query_param("action", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LOGIN_PAGE))
        .expect(expected_logins)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", format!("{cookie}; Path=/; HttpOnly").as_str()),
        )
        .expect(expected_logins)
        .mount(server)
        .await;
}

pub fn page_url(server: &MockServer, path: &str) -> url::Url {
    url::Url::parse(&format!("{}{path}", server.uri())).unwrap()
}
