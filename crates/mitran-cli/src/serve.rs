//! Serve command: builds the chat client and runs the HTTP server.
//!
//! Startup sequence:
//! 1. Load config (file, `.env`, environment), apply `--host`/`--port`
//! 2. Build the chat client; a missing API key aborts startup
//! 3. Serve until Ctrl+C, then shut down gracefully

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use mitran_agent::ChatClient;
use mitran_core::config::{load_config, Config};
use mitran_server::{run_server, AppState};

use crate::helpers;

/// Run the server.
pub async fn run(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = with_bind_overrides(load_config(config_path), host, port);

    let client = ChatClient::from_config(&config).with_context(|| {
        format!(
            "cannot start: set {} in the environment or .env",
            config.provider.api_key_env
        )
    })?;

    info!(
        model = client.model(),
        max_turns = client.history().max_turns(),
        system_prompt = client.has_system_instruction(),
        google_search = config.model.google_search,
        "chat client ready"
    );

    let addr = config.server.address();
    helpers::print_banner();
    println!("  Model:   {}", client.model());
    println!("  Chat:    http://{addr}/");
    println!("  Ctrl+C to stop");
    println!();

    let state = AppState::new(Arc::new(client), config.model.google_search);
    run_server(state, &addr, shutdown_signal())
        .await
        .with_context(|| format!("server on {addr} failed"))?;

    println!("  Server stopped. Goodbye!");
    Ok(())
}

fn with_bind_overrides(mut config: Config, host: Option<String>, port: Option<u16>) -> Config {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    println!();
    info!("received Ctrl+C, shutting down");
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
