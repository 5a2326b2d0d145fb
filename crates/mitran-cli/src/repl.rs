//! Terminal chat: single-shot or interactive REPL against a running server.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use mitran_core::config::load_config;

use crate::helpers;
use crate::remote::ChatRemote;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Entry point for `mitran chat`.
pub async fn run_chat(message: Option<String>, session_id: &str, url: Option<String>) -> Result<()> {
    let base_url = url.unwrap_or_else(|| format!("http://{}", load_config(None).server.address()));
    let remote = ChatRemote::new(base_url);

    match message {
        Some(msg) => {
            debug!(session = session_id, "single-shot message");
            send_and_print(&remote, session_id, &msg).await
        }
        None => run(&remote, session_id).await,
    }
}

/// Run the interactive REPL loop.
async fn run(remote: &ChatRemote, session_id: &str) -> Result<()> {
    helpers::print_banner();
    println!("  {} {}", "Server:".dimmed(), remote.base_url().dimmed());
    println!("  {} {}", "Session:".dimmed(), session_id.dimmed());
    println!();

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            // Ctrl-C / Ctrl-D
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        if is_exit_command(trimmed) {
            println!("\nGoodbye!");
            break;
        }

        let _ = editor.add_history_entry(&input);

        if let Err(e) = send_and_print(remote, session_id, trimmed).await {
            eprintln!("\n{} {e}\n", "Error:".red().bold());
        }
    }

    save_history(&mut editor);

    Ok(())
}

/// Stream one reply to stdout as it arrives.
async fn send_and_print(remote: &ChatRemote, session_id: &str, text: &str) -> Result<()> {
    println!();
    println!("{}", helpers::ASSISTANT_LABEL.cyan().bold());
    let reply = remote
        .stream_reply(session_id, text, |fragment| {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();
    if matches!(&reply, Ok(text) if text.is_empty()) {
        println!("{}", "(no response)".dimmed());
    }
    println!();
    reply.map(|_| ())
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    mitran_core::utils::get_data_path()
        .join("history")
        .join("chat_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
