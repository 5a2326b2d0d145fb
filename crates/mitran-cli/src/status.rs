//! `mitran status`: show configuration and credential status.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use mitran_core::config::{get_config_path, load_config};
use mitran_core::utils::expand_home;

use crate::helpers::mark;

/// Run the status command.
pub fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let shown_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    println!();
    println!("{}", "Mitran Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        shown_path.display(),
        if shown_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found, using defaults)".dimmed().to_string()
        }
    );

    println!("  {:<18} {}", "Model:".bold(), config.model.name);
    println!(
        "  {:<18} {}",
        "API key:".bold(),
        mark(
            config.provider.api_key().is_some(),
            &format!(
                "{} {}",
                config.provider.api_key_env,
                if config.provider.api_key().is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            ),
        )
    );
    println!("  {:<18} {}", "API base:".bold(), config.provider.api_base.dimmed());

    let prompt_path = expand_home(&config.prompt.system_prompt_path);
    println!(
        "  {:<18} {}",
        "System prompt:".bold(),
        mark(prompt_path.exists(), &prompt_path.display().to_string())
    );

    let window = config.session.window();
    println!(
        "  {:<18} {}",
        "History window:".bold(),
        if window == 0 {
            "unlimited".to_string()
        } else {
            format!("{window} turns ({} messages)", window * 2)
        }
    );
    println!(
        "  {:<18} {}",
        "Google Search:".bold(),
        mark(
            config.model.google_search,
            if config.model.google_search { "enabled" } else { "disabled" }
        )
    );
    println!(
        "  {:<18} http://{}/",
        "Server:".bold(),
        config.server.address()
    );

    println!();

    Ok(())
}
