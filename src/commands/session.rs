//! Session command handlers: login, logout, status, and stored credentials.

use anyhow::{Result, anyhow};
use serde::Serialize;
use tracing::info;
use zerobyw_core::source::{SOURCE_LANG, SOURCE_NAME};
use zerobyw_core::{Credentials, ForumSource, Session};

use super::Output;

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    source: &'static str,
    lang: &'static str,
    base_url: &'a str,
    username: Option<&'a str>,
    password_set: bool,
    logged_in: bool,
    cookies: usize,
    invalidate_on: &'static str,
}

pub async fn run_login_command(source: &ForumSource, output: Output) -> Result<()> {
    let session = source
        .client()
        .login()
        .await
        .map_err(|error| anyhow!("Login failed: {error}"))?;

    if !output.emit_json(&serde_json::json!({ "logged_in": true, "cookies": session.cookie_count() }))? {
        println!("logged in ({} cookies)", session.cookie_count());
    }
    Ok(())
}

pub async fn run_logout_command(source: &ForumSource, output: Output) -> Result<()> {
    source.client().logout().await;
    info!("Stored session cleared");

    if !output.emit_json(&serde_json::json!({ "logged_in": false }))? {
        println!("logged out");
    }
    Ok(())
}

pub async fn run_status_command(source: &ForumSource, output: Output) -> Result<()> {
    let store = source.client().store();
    let credentials = store.credentials().await;
    let session = store.session().await;

    let report = StatusReport {
        source: SOURCE_NAME,
        lang: SOURCE_LANG,
        base_url: store.endpoint().as_str(),
        username: credentials.username.as_deref(),
        password_set: credentials
            .password
            .as_deref()
            .is_some_and(|p| !p.is_empty()),
        logged_in: session.is_some(),
        cookies: session.as_ref().map_or(0, Session::cookie_count),
        invalidate_on: source.client().invalidation().as_str(),
    };

    if output.emit_json(&report)? {
        return Ok(());
    }
    println!("source = {} ({})", report.source, report.lang);
    println!("base_url = {}", report.base_url);
    println!("username = {}", report.username.unwrap_or("<not set>"));
    println!(
        "password = {}",
        if report.password_set { "<set>" } else { "<not set>" }
    );
    println!(
        "session = {}",
        if report.logged_in {
            format!("active ({} cookies)", report.cookies)
        } else {
            "none".to_string()
        }
    );
    println!("invalidate_on = {}", report.invalidate_on);
    Ok(())
}

pub async fn run_configure_command(
    source: &ForumSource,
    username: Option<String>,
    password: Option<String>,
    output: Output,
) -> Result<()> {
    let credentials = Credentials::new(username, password);
    let complete = credentials.is_complete();
    source.configure(credentials).await;
    info!(complete, "Stored credentials updated");

    if !output.emit_json(&serde_json::json!({ "credentials_complete": complete }))? {
        if complete {
            println!("credentials saved");
        } else {
            println!("credentials saved (incomplete; requests will run unauthenticated)");
        }
    }
    Ok(())
}
