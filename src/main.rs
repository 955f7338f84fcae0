//! CLI entry point for the zerobyw forum client.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{debug, info};
use zerobyw_core::config::{
    load_file_config, resolve_default_config_path, resolve_default_database_path,
    resolve_endpoint,
};
use zerobyw_core::{
    AuthenticatingClient, CredentialStore, Credentials, Database, FileConfig, ForumSource,
    HttpTransport, PreferenceStore, SqlitePreferences, TransportSettings,
};

mod cli;
mod commands;

use cli::Args;
use commands::Output;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(command = ?args.command, "CLI arguments parsed");

    let file_config = match args.config.clone().or_else(resolve_default_config_path) {
        Some(path) => load_file_config(&path)?,
        None => FileConfig::default(),
    };

    let database_path = resolve_database_path(&args, &file_config)?;
    if let Some(parent) = database_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let db = Database::new(&database_path).await?;
    debug!(path = %database_path.display(), "opened preference database");

    let preferences: Arc<dyn PreferenceStore> = Arc::new(SqlitePreferences::new(db));
    let explicit_base_url = args.base_url.clone().or_else(|| file_config.base_url.clone());
    let endpoint = resolve_endpoint(explicit_base_url.as_deref(), preferences.as_ref()).await?;
    info!(endpoint = %endpoint, "zerobyw starting");

    let store = Arc::new(CredentialStore::open(preferences, endpoint).await);
    apply_credential_overrides(&args, &file_config, &store).await;

    let settings = transport_settings(&args, &file_config);
    debug!(
        rate_limit_ms = settings.rate_limit.as_millis(),
        "transport configured"
    );
    let transport = HttpTransport::new(&settings)?;

    let client = AuthenticatingClient::new(Arc::new(transport), store)
        .with_invalidation(file_config.invalidate_on.unwrap_or_default());
    let source = ForumSource::new(client);

    let output = if args.json { Output::Json } else { Output::Text };
    commands::run(args.command, &source, output).await
}

fn resolve_database_path(args: &Args, file_config: &FileConfig) -> Result<PathBuf> {
    args.database
        .clone()
        .or_else(|| file_config.database.clone())
        .or_else(resolve_default_database_path)
        .ok_or_else(|| anyhow!("cannot determine a database path; pass --database or set HOME"))
}

/// Writes credentials from flags, environment, or config file into the store.
///
/// Only the supplied parts are replaced, and the store is left untouched when
/// nothing changes so the existing session survives.
async fn apply_credential_overrides(args: &Args, file_config: &FileConfig, store: &CredentialStore) {
    let username = args.username.clone().or_else(|| file_config.username.clone());
    let password = args.password.clone().or_else(|| file_config.password.clone());
    if username.is_none() && password.is_none() {
        return;
    }

    let stored = store.credentials().await;
    let merged = Credentials::new(
        username.or_else(|| stored.username.clone()),
        password.or_else(|| stored.password.clone()),
    );
    if merged != stored {
        debug!("updating stored credentials");
        store.set_credentials(merged).await;
    }
}

fn transport_settings(args: &Args, file_config: &FileConfig) -> TransportSettings {
    let defaults = TransportSettings::default();
    TransportSettings {
        connect_timeout: file_config
            .connect_timeout_secs
            .map_or(defaults.connect_timeout, Duration::from_secs),
        read_timeout: file_config
            .read_timeout_secs
            .map_or(defaults.read_timeout, Duration::from_secs),
        rate_limit: args
            .rate_limit
            .or(file_config.rate_limit)
            .map_or(defaults.rate_limit, Duration::from_millis),
    }
}
