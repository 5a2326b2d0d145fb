//! Mitran CLI: entry point.
//!
//! # Commands
//!
//! - `mitran serve [--config PATH] [--host H] [--port P]`: run the HTTP API and chat page
//! - `mitran chat [-s SESSION] [-m MESSAGE] [--url URL]`: terminal chat against a running server
//! - `mitran status`: show configuration and credential status

mod helpers;
mod remote;
mod repl;
mod serve;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Mitran: chat relay for a hosted generative model
#[derive(Parser)]
#[command(name = "mitran", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (API + browser chat page)
    Serve {
        /// Config file (defaults to ~/.mitran/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bind host, overriding config
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding config
        #[arg(long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Chat with a running server (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Session identifier
        #[arg(short, long, default_value = "cli:default")]
        session: String,

        /// Server base URL (defaults to the configured host and port)
        #[arg(long)]
        url: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and credential status
    Status {
        /// Config file (defaults to ~/.mitran/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            logs,
        } => {
            init_logging(logs, "info");
            serve::run(config.as_deref(), host, port).await
        }
        Commands::Chat {
            message,
            session,
            url,
            logs,
        } => {
            init_logging(logs, "warn");
            repl::run_chat(message, &session, url).await
        }
        Commands::Status { config } => {
            init_logging(false, "warn");
            status::run(config.as_deref())
        }
    }
}

/// Initialize tracing/logging. `RUST_LOG` wins when set.
fn init_logging(verbose: bool, quiet_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("mitran=debug,info")
        } else {
            EnvFilter::new(quiet_level)
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
