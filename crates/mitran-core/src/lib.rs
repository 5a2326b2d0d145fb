//! Core building blocks for Mitran: conversation types, the in-memory
//! history store, and configuration loading.

pub mod config;
pub mod history;
pub mod types;
pub mod utils;

pub use history::HistoryStore;
pub use types::{Role, Turn};
