//! Mitran Agent: the chat client that ties session history to the
//! upstream generation provider.
//!
//! This crate contains:
//! - **client**: buffered and streamed exchanges that record turns
//! - **exchange**: per-session exchange locks
//! - **prompt**: system prompt loading

pub mod client;
mod exchange;
pub mod prompt;

pub use client::ChatClient;
pub use prompt::read_system_prompt;
