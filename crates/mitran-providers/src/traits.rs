//! Generation provider trait: the seam between the chat client and the
//! upstream API.
//!
//! `GeminiProvider` in `gemini.rs` is the production implementation; tests
//! plug in scripted providers.

use async_trait::async_trait;
use futures::stream::BoxStream;
use mitran_core::types::Turn;

use crate::error::GenerationError;

/// Finite, non-restartable stream of assistant text fragments.
pub type FragmentStream = BoxStream<'static, Result<String, GenerationError>>;

/// Everything the upstream needs for one call.
#[derive(Clone, Debug, Default)]
pub struct GenerationRequest {
    /// System instruction, if one is configured.
    pub system_instruction: Option<String>,
    /// Conversation so far, oldest first, ending with the new user turn.
    pub contents: Vec<Turn>,
}

impl GenerationRequest {
    pub fn new(system_instruction: Option<String>, contents: Vec<Turn>) -> Self {
        Self {
            system_instruction,
            contents,
        }
    }
}

/// Trait that all upstream generation backends implement.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Start a streamed generation.
    ///
    /// Errors that happen before the first byte (transport, non-2xx status)
    /// are returned directly; later failures arrive as `Err` items.
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError>;

    /// Model identifier used for every call.
    fn model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
