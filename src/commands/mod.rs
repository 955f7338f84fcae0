//! CLI command handlers.

mod catalog;
mod session;

use anyhow::Result;
use serde::Serialize;
use zerobyw_core::ForumSource;

use crate::cli::Command;

pub use catalog::{run_list_command, run_manga_command, run_pages_command};
pub use session::{
    run_configure_command, run_login_command, run_logout_command, run_status_command,
};

/// How command results are printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    /// Prints `value` as pretty JSON; returns `false` in text mode.
    pub(crate) fn emit_json<T: Serialize + ?Sized>(self, value: &T) -> Result<bool> {
        if self == Self::Text {
            return Ok(false);
        }
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(true)
    }
}

pub async fn run(command: Command, source: &ForumSource, output: Output) -> Result<()> {
    match command {
        Command::Login => run_login_command(source, output).await,
        Command::Logout => run_logout_command(source, output).await,
        Command::Status => run_status_command(source, output).await,
        Command::Configure { username, password } => {
            run_configure_command(source, username, password, output).await
        }
        Command::List { page } => run_list_command(source, page, output).await,
        Command::Manga { url } => run_manga_command(source, &url, output).await,
        Command::Pages { urls, concurrency } => {
            run_pages_command(source, urls, usize::from(concurrency), output).await
        }
    }
}
