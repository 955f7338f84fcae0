//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default number of chapters fetched at once by `pages`.
pub const DEFAULT_PAGE_CONCURRENCY: u8 = 4;

/// Browse a members-only manga forum from the command line.
///
/// Requests carry the stored session cookie; when the forum rejects it the
/// client logs in again with the stored credentials and retries once.
#[derive(Parser, Debug)]
#[command(name = "zerobyw")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Site base URL (persisted for later runs)
    #[arg(long, global = true, env = "ZEROBYW_BASE_URL")]
    pub base_url: Option<String>,

    /// Forum username (stored with the credentials)
    #[arg(long, global = true, env = "ZEROBYW_USERNAME")]
    pub username: Option<String>,

    /// Forum password (stored with the credentials)
    #[arg(long, global = true, env = "ZEROBYW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Preference database path
    #[arg(long, global = true, env = "ZEROBYW_DATABASE")]
    pub database: Option<PathBuf>,

    /// Config file path (defaults to ~/.config/zerobyw/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Minimum delay between requests to the same host in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, global = true, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in now with the stored credentials
    Login,

    /// Forget the stored session
    Logout,

    /// Show endpoint, credential, and session state
    Status,

    /// Store forum credentials (an omitted value is cleared)
    Configure {
        /// Forum username
        #[arg(long = "user")]
        username: Option<String>,

        /// Forum password
        #[arg(long = "pass")]
        password: Option<String>,
    },

    /// List manga from the catalog
    List {
        /// Catalog page (starts at 1)
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
    },

    /// Show a manga's details and chapters
    Manga {
        /// Manga detail page URL (absolute or site-relative)
        url: String,
    },

    /// List page images of one or more chapters
    Pages {
        /// Chapter URLs (absolute or site-relative)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Chapters fetched concurrently (1-16)
        #[arg(short = 'c', long, default_value_t = DEFAULT_PAGE_CONCURRENCY, value_parser = clap::value_parser!(u8).range(1..=16))]
        concurrency: u8,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_status_parses_with_defaults() {
        let args = Args::try_parse_from(["zerobyw", "status"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.json);
        assert_eq!(args.rate_limit, None);
        assert_eq!(args.command, Command::Status);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["zerobyw", "-vv", "status"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["zerobyw", "status", "--verbose"]).unwrap();
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_cli_requires_a_command() {
        let err = Args::try_parse_from(["zerobyw"]).unwrap_err();
        assert!(matches!(
            err.kind(),
            clap::error::ErrorKind::MissingSubcommand
                | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        ));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["zerobyw", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_global_flags_after_command() {
        let args = Args::try_parse_from([
            "zerobyw",
            "list",
            "--page",
            "3",
            "--base-url",
            "https://forum.example",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.command, Command::List { page: 3 });
        assert_eq!(args.base_url.as_deref(), Some("https://forum.example"));
        assert!(args.json);
    }

    #[test]
    fn test_cli_list_page_zero_rejected() {
        let err = Args::try_parse_from(["zerobyw", "list", "--page", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_rate_limit_over_max_rejected() {
        let err = Args::try_parse_from(["zerobyw", "-l", "60001", "status"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_configure_takes_user_and_pass() {
        let args =
            Args::try_parse_from(["zerobyw", "configure", "--user", "reader", "--pass", "pw"])
                .unwrap();
        assert_eq!(
            args.command,
            Command::Configure {
                username: Some("reader".into()),
                password: Some("pw".into()),
            }
        );
    }

    #[test]
    fn test_cli_pages_requires_urls() {
        let err = Args::try_parse_from(["zerobyw", "pages"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let args = Args::try_parse_from(["zerobyw", "pages", "a.html", "b.html", "-c", "2"]).unwrap();
        assert_eq!(
            args.command,
            Command::Pages {
                urls: vec!["a.html".into(), "b.html".into()],
                concurrency: 2,
            }
        );
    }
}
