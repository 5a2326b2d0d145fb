//! Configuration schema.
//!
//! Hierarchy: `Config` → `ModelConfig`, `SessionConfig`, `PromptConfig`,
//! `ProviderConfig`, `ServerConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};

/// Default upstream endpoint for the Gemini API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: defaults, then `~/.mitran/config.json`, then env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub model: ModelConfig,
    pub session: SessionConfig,
    pub prompt: PromptConfig,
    pub provider: ProviderConfig,
    pub server: ServerConfig,
}

// ─────────────────────────────────────────────
// Model
// ─────────────────────────────────────────────

/// Which model to call and how.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    /// Upstream model identifier.
    pub name: String,
    /// Attach the Google Search grounding tool to every request.
    pub google_search: bool,
    /// Thinking token budget; `-1` lets the model decide.
    pub thinking_budget: i32,
    /// Threshold applied to every harm category.
    pub safety_threshold: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".to_string(),
            google_search: true,
            thinking_budget: -1,
            safety_threshold: "BLOCK_ONLY_HIGH".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// User/assistant pairs kept per session. Zero or negative disables trimming.
    pub max_turns: i64,
}

impl SessionConfig {
    /// Window size in turn pairs as understood by the history store.
    pub fn window(&self) -> usize {
        usize::try_from(self.max_turns).unwrap_or(0)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_turns: 12 }
    }
}

// ─────────────────────────────────────────────
// Prompt
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptConfig {
    /// File holding the system instruction. A missing file means none.
    pub system_prompt_path: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt_path: "prompts/system.txt".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// Upstream endpoint and credential lookup.
///
/// The key itself is never stored in the file; only the name of the
/// environment variable that holds it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub api_key_env: String,
    pub api_base: String,
}

impl ProviderConfig {
    /// Read the credential from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` string suitable for binding or building a base URL.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
