#![forbid(unsafe_code)]

mod cmd;
mod host;
mod jira;

use std::env;
use std::io;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ticketpad_core::{App, ErrorCode};
use ticketpad_core::config::load_config;
use ticketpad_core::surface::MemorySurface;

use crate::host::Host;
use crate::jira::JiraClient;

#[derive(Parser, Debug)]
#[command(
    name = "tp",
    author,
    version,
    about = "ticketpad: edit Jira tickets as plain text",
    long_about = None,
    args_conflicts_with_subcommands = true,
    after_help = "EXAMPLES:\n    # Open your assigned issues\n    tp https://jira.example.com\n\n    # Open one ticket\n    tp -a alice:TOKEN https://jira.example.com WEB-12"
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short = 'D', long)]
    debug: bool,

    /// Column to reflow descriptions and comments at.
    #[arg(short, long, value_name = "N")]
    width: Option<usize>,

    /// Credentials as `username:personal_access_token`. Falls back to
    /// TICKETPAD_AUTH.
    #[arg(short, long, value_name = "USER:TOKEN")]
    auth: Option<String>,

    /// Jira base URL. Falls back to `server` in the config file.
    server: Option<String>,

    /// Window to open first: an issue key, my-issues, search or filters.
    window: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    tp completions bash > ~/.local/share/bash-completion/completions/tp"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

/// Username and token from `user:token`. A value without a colon is all
/// token.
fn parse_auth(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((user, token)) => (Some(user).filter(|u| !u.is_empty()), token),
        None => (None, raw),
    }
}

/// Filter used when `TICKETPAD_LOG` is unset. Covers the library targets
/// (`ticketpad_core::…`) and this binary's own (`tp::…`).
const fn default_directives(debug: bool) -> &'static str {
    if debug {
        "ticketpad=debug,tp=debug,info"
    } else {
        "ticketpad=info,tp=info,warn"
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_env("TICKETPAD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    let format = env::var("TICKETPAD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Some(Commands::Completions(args)) = cli.command {
        return cmd::completions::run_completions(args.shell, &mut Cli::command());
    }

    let mut config = load_config().with_context(|| {
        let code = ErrorCode::ConfigParseError;
        let hint = code.hint().map(|h| format!(" ({h})")).unwrap_or_default();
        format!("{code}: {}{hint}", code.message())
    })?;
    if let Some(width) = cli.width {
        config.wrap_width = width;
    }
    let Some(server) = cli.server.clone().or_else(|| config.server.clone()) else {
        bail!("no server given: pass the Jira URL or set `server` in the config file");
    };

    let auth = cli.auth.clone().or_else(|| env::var("TICKETPAD_AUTH").ok());
    let token = auth.as_deref().map(|raw| {
        let (user, token) = parse_auth(raw);
        debug!(user = user.unwrap_or("-"), "using token credentials");
        token.to_string()
    });

    info!(%server, "connecting");
    let tracker = Arc::new(JiraClient::new(&server, token));
    let surface = MemorySurface::new();
    let app = App::new(tracker, Arc::new(surface.clone()), config);

    let window = cli.window.join(" ");
    app.start(Some(window.as_str()).filter(|w| !w.is_empty()));
    if app.registry().is_empty() {
        bail!("nothing to open for {window:?}");
    }

    let host = Host::new(Arc::clone(&app), surface);
    let stdin = io::stdin();
    host.run(stdin.lock(), &mut io::stdout())
        .context("terminal session failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_splits_on_first_colon() {
        assert_eq!(parse_auth("alice:abc:def"), (Some("alice"), "abc:def"));
        assert_eq!(parse_auth("bare-token"), (None, "bare-token"));
        assert_eq!(parse_auth(":tok"), (None, "tok"));
    }

    #[test]
    fn debug_filter_covers_binary_and_library_targets() {
        let directives: Vec<&str> = default_directives(true).split(',').collect();
        assert!(directives.contains(&format!("{}=debug", env!("CARGO_CRATE_NAME")).as_str()));
        assert!(directives.contains(&"ticketpad=debug"));
        assert!(EnvFilter::try_new(default_directives(true)).is_ok());
        assert!(EnvFilter::try_new(default_directives(false)).is_ok());
    }

    #[test]
    fn cli_parses_server_and_window() {
        let cli = Cli::try_parse_from(["tp", "-D", "-w", "72", "https://jira.example.com", "WEB-12"])
            .expect("parse");
        assert!(cli.debug);
        assert_eq!(cli.width, Some(72));
        assert_eq!(cli.server.as_deref(), Some("https://jira.example.com"));
        assert_eq!(cli.window, vec!["WEB-12".to_string()]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_completions() {
        let cli = Cli::try_parse_from(["tp", "completions", "zsh"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::Completions(_))));
    }

    #[test]
    fn command_is_named_after_the_binary() {
        assert_eq!(Cli::command().get_name(), "tp");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
