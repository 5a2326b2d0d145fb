//! Errors surfaced by the upstream generation layer.

use thiserror::Error;

/// Anything that can go wrong between us and the upstream API.
///
/// None of these are retried; they propagate to the caller as-is.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("upstream stream broke: {0}")]
    Stream(String),

    #[error("prompt blocked by upstream: {0}")]
    Blocked(String),
}

impl GenerationError {
    /// Short machine-readable code, used in HTTP error bodies and SSE error frames.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::MissingApiKey(_) => "MISSING_API_KEY",
            GenerationError::Http(_) => "UPSTREAM_UNREACHABLE",
            GenerationError::Api { .. } => "UPSTREAM_ERROR",
            GenerationError::Decode(_) | GenerationError::Stream(_) => "UPSTREAM_PROTOCOL",
            GenerationError::Blocked(_) => "PROMPT_BLOCKED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GenerationError::Api {
            status: 429,
            body: "quota".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned 429: quota");
        assert_eq!(err.code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn test_missing_key_names_variable() {
        let err = GenerationError::MissingApiKey("GEMINI_API_KEY".to_string());
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
