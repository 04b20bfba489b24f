//! boardbridge - the Miro REST API as MCP tools over stdio.
//!
//! Main entry point for the boardbridge CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{auth, rate_limit, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// boardbridge - Miro boards as MCP tools
#[derive(Parser)]
#[command(name = "boardbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP tool server on stdin/stdout (default)
    Serve(serve::ServeArgs),

    /// Authentication management
    Auth(auth::AuthArgs),

    /// Local rate-limit state
    RateLimit(rate_limit::RateLimitArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

const CRATE_TARGETS: [&str; 5] = [
    "boardbridge",
    "boardbridge_config",
    "boardbridge_oauth",
    "boardbridge_client",
    "boardbridge_mcp",
];

fn directives(level: &str, fallback: &str) -> String {
    let mut directives: Vec<String> = CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push(fallback.to_string());
    directives.join(",")
}

/// Console (stderr, human-readable) plus rotating JSON file.
///
/// stdout carries the JSON-RPC stream, so nothing may log there.
fn init_tracing(verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(directives("debug", "info"))
        } else {
            EnvFilter::new(directives("info", "warn"))
        }
    });

    let log_dir = boardbridge_config::data_dir(&|key: &str| std::env::var(key).ok())
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("boardbridge.log")
        .build(&log_dir);

    let (file_layer, guard) = match file_appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(directives("trace", "info")));
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        None => serve::run(serve::ServeArgs::default(), &ctx).await,
        Some(Commands::Serve(args)) => serve::run(args, &ctx).await,
        Some(Commands::Auth(args)) => auth::run(args, &ctx).await,
        Some(Commands::RateLimit(args)) => rate_limit::run(args, &ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(
            directives("debug", "info"),
            "boardbridge=debug,boardbridge_config=debug,boardbridge_oauth=debug,boardbridge_client=debug,boardbridge_mcp=debug,info"
        );
    }

    #[test]
    fn test_cli_parses_default_command() {
        let cli = Cli::try_parse_from(["boardbridge"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["boardbridge", "-v", "rate-limit", "status", "--json"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::RateLimit(_))));
    }
}
