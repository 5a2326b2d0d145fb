//! Config loader: reads `~/.mitran/config.json`, then `.env`, then
//! environment variables.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.mitran/config.json` (or an explicit path)
//! 3. Environment variables, including any loaded from `.env`

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path (or `path`) + `.env` + env vars.
///
/// Falls back to defaults if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    match dotenv::dotenv() {
        Ok(env_path) => debug!("Loaded environment from {}", env_path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to load .env: {}", e),
    }

    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let config = load_config_from_path(&config_path);
    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Load config from a specific file path, without env overrides.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Parse a boolean flag the lenient way: `1`, `true`, `yes`, `on`.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `MODEL_NAME` → `model.name`
/// - `GOOGLE_SEARCH_TOOL_ENABLED` → `model.google_search`
/// - `SESSION_MAX_TURNS` → `session.max_turns`
/// - `SYSTEM_PROMPT_PATH` → `prompt.system_prompt_path`
/// - `MITRAN_PROVIDER__API_KEY_ENV` → `provider.api_key_env`
/// - `MITRAN_PROVIDER__API_BASE` → `provider.api_base`
/// - `MITRAN_SERVER__HOST` → `server.host`
/// - `MITRAN_SERVER__PORT` → `server.port`
fn apply_env_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(val) = lookup("MODEL_NAME") {
        config.model.name = val;
    }
    if let Some(val) = lookup("GOOGLE_SEARCH_TOOL_ENABLED") {
        config.model.google_search = parse_flag(&val);
    }
    if let Some(val) = lookup("SESSION_MAX_TURNS") {
        match val.trim().parse::<i64>() {
            Ok(n) => config.session.max_turns = n,
            Err(e) => warn!("Ignoring SESSION_MAX_TURNS={}: {}", val, e),
        }
    }
    if let Some(val) = lookup("SYSTEM_PROMPT_PATH") {
        config.prompt.system_prompt_path = val;
    }

    if let Some(val) = lookup("MITRAN_PROVIDER__API_KEY_ENV") {
        config.provider.api_key_env = val;
    }
    if let Some(val) = lookup("MITRAN_PROVIDER__API_BASE") {
        config.provider.api_base = val;
    }

    if let Some(val) = lookup("MITRAN_SERVER__HOST") {
        config.server.host = val;
    }
    if let Some(val) = lookup("MITRAN_SERVER__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.server.port = p;
        }
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn with_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.session.max_turns, 12);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "model": { "name": "gemini-2.5-pro", "googleSearch": false },
            "session": { "maxTurns": 4 }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert!(!config.model.google_search);
        assert_eq!(config.session.max_turns, 4);
        // Default preserved
        assert_eq!(config.model.safety_threshold, "BLOCK_ONLY_HIGH");
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.model.name, "gemini-2.5-flash");
    }

    #[test]
    fn test_env_overrides() {
        let env = with_env(&[
            ("MODEL_NAME", "gemini-exp"),
            ("GOOGLE_SEARCH_TOOL_ENABLED", "off"),
            ("SESSION_MAX_TURNS", "3"),
            ("SYSTEM_PROMPT_PATH", "/etc/mitran/prompt.txt"),
            ("MITRAN_PROVIDER__API_KEY_ENV", "MY_KEY"),
            ("MITRAN_SERVER__PORT", "9999"),
        ]);
        let config = apply_env_overrides(Config::default(), env);
        assert_eq!(config.model.name, "gemini-exp");
        assert!(!config.model.google_search);
        assert_eq!(config.session.max_turns, 3);
        assert_eq!(config.prompt.system_prompt_path, "/etc/mitran/prompt.txt");
        assert_eq!(config.provider.api_key_env, "MY_KEY");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_env_override_beats_file() {
        let file = write_temp_json(r#"{ "model": { "name": "from-file" } }"#);
        let config = apply_env_overrides(
            load_config_from_path(file.path()),
            with_env(&[("MODEL_NAME", "from-env")]),
        );
        assert_eq!(config.model.name, "from-env");
    }

    #[test]
    fn test_invalid_numbers_ignored() {
        let env = with_env(&[("SESSION_MAX_TURNS", "lots"), ("MITRAN_SERVER__PORT", "http")]);
        let config = apply_env_overrides(Config::default(), env);
        assert_eq!(config.session.max_turns, 12);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_parse_flag() {
        for yes in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_flag(yes), "{yes}");
        }
        for no in ["0", "false", "no", "off", ""] {
            assert!(!parse_flag(no), "{no}");
        }
    }
}
