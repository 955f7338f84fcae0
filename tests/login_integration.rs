//! Integration tests for the site login flow.

use std::sync::Arc;

use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use zerobyw_core::{AuthError, Credentials, FetchError, Session, SiteLoginClient};

mod support;
use support::site::{LOGIN_PAGE, forum, mount_login, transport};
use support::socket_guard::start_mock_server_or_skip;

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials::new(Some(username.into()), Some(password.into()))
}

async fn mount_login_page(server: &wiremock::MockServer, html: &str) {
    Mock::given(method("GET"))
        .and(path("/member.php"))
        .and(query_param("mod", "logging"))
        .and(query_param("action", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_submits_form_fields_with_credentials() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login_page(&server, LOGIN_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("token=xyz&username=user&password=pass&loginsubmit=true"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", "a=1; Path=/")
                .append_header("Set-Cookie", "b=2; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let site = forum(&server, None, None).await;
    let login = SiteLoginClient::new(transport(std::time::Duration::from_secs(5)), Arc::clone(&site.store));
    let session = login
        .login(site.store.endpoint(), &credentials("user", "pass"))
        .await
        .unwrap();

    assert_eq!(session.as_str(), "a=1; b=2");
    assert_eq!(site.store.session().await, Some(session));
}

#[tokio::test]
async fn test_login_without_post_form_issues_no_submission() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login_page(
        &server,
        r#"<form method="get" action="/search.php"><input name="q"/></form>"#,
    )
    .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let site = forum(&server, Some(("user", "pass")), None).await;
    let err = site.client.login().await.unwrap_err();

    assert!(
        matches!(err, FetchError::Authentication(AuthError::FormNotFound { .. })),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_login_without_set_cookie_keeps_existing_session() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login_page(&server, LOGIN_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("wrong password"))
        .expect(1)
        .mount(&server)
        .await;

    let site = forum(&server, Some(("user", "wrong")), Some("sid=kept")).await;
    let err = site.client.login().await.unwrap_err();

    assert!(
        matches!(err, FetchError::Authentication(AuthError::NoSessionIssued { .. })),
        "got {err:?}"
    );
    assert_eq!(
        site.store.session().await,
        Some(Session::new("sid=kept").unwrap())
    );
}

#[tokio::test]
async fn test_login_rejected_submission_reports_status() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login_page(&server, LOGIN_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let site = forum(&server, Some(("user", "pass")), None).await;
    let err = site.client.login().await.unwrap_err();

    assert!(
        matches!(
            err,
            FetchError::Authentication(AuthError::SubmitFailed { status: 502, .. })
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_login_with_blank_password_makes_no_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_login(&server, "sid=unused", 0).await;

    let site = forum(&server, Some(("user", "  ")), None).await;
    let err = site.client.login().await.unwrap_err();

    assert!(
        matches!(err, FetchError::Authentication(AuthError::MissingCredentials)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_login_page_error_status_still_parses_form() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/member.php"))
        .respond_with(ResponseTemplate::new(404).set_body_string(LOGIN_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(200).append_header("Set-Cookie", "sid=ok; Path=/"))
        .expect(1)
        .mount(&server)
        .await;

    let site = forum(&server, Some(("user", "pass")), None).await;
    let session = site.client.login().await.unwrap();
    assert_eq!(session.as_str(), "sid=ok");
}
