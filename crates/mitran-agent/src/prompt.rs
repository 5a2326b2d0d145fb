//! System prompt loading.

use std::path::Path;

use tracing::{debug, warn};

/// Read the system instruction from `path`.
///
/// A missing or blank file yields `None`; the assistant then runs without a
/// system instruction.
pub fn read_system_prompt(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                debug!(path = %path.display(), "system prompt file is empty");
                None
            } else {
                debug!(path = %path.display(), chars = trimmed.len(), "loaded system prompt");
                Some(trimmed.to_string())
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no system prompt file");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read system prompt");
            None
        }
    }
}
