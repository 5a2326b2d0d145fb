//! Chat client: runs one user/assistant exchange against the upstream
//! provider and records it in the history store.
//!
//! Exchange protocol:
//! 1. take the per-session exchange lock
//! 2. send the stored history plus the new user turn upstream
//! 3. relay fragments to the caller while assembling the reply
//! 4. record the user turn and the reply together once the reply is complete
//!
//! Nothing touches the store before step 4, so a failed, empty or abandoned
//! exchange leaves history exactly as it was. Steps 3 and 4 run in a spawned
//! task and complete even when the caller stops listening halfway.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use mitran_core::config::Config;
use mitran_core::history::HistoryStore;
use mitran_core::types::Turn;
use mitran_core::utils::{expand_home, truncate_string};
use mitran_providers::{
    create_provider, FragmentStream, GenerationError, GenerationProvider, GenerationRequest,
};

use crate::exchange::ExchangeLocks;
use crate::prompt::read_system_prompt;

/// Fragments buffered between the upstream relay and a slow consumer.
const FRAGMENT_BUFFER: usize = 32;

/// Session-aware front end to a [`GenerationProvider`].
pub struct ChatClient {
    provider: Arc<dyn GenerationProvider>,
    history: Arc<HistoryStore>,
    system_instruction: Option<String>,
    exchanges: ExchangeLocks,
}

impl ChatClient {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        history: Arc<HistoryStore>,
        system_instruction: Option<String>,
    ) -> Self {
        ChatClient {
            provider,
            history,
            system_instruction,
            exchanges: ExchangeLocks::default(),
        }
    }

    /// Build a client from the loaded configuration: Gemini provider, a
    /// fresh history store, and the system prompt file.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let provider = create_provider(config)?;
        let history = Arc::new(HistoryStore::new(config.session.window()));
        let prompt = read_system_prompt(&expand_home(&config.prompt.system_prompt_path));
        Ok(Self::new(Arc::new(provider), history, prompt))
    }

    /// The store this client records into.
    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Upstream model identifier.
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn has_system_instruction(&self) -> bool {
        self.system_instruction.is_some()
    }

    /// Buffered exchange: returns the full assistant reply.
    pub async fn generate(&self, session_id: &str, text: &str) -> Result<String, GenerationError> {
        let mut fragments = self.stream(session_id, text).await?;
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            reply.push_str(&fragment?);
        }
        Ok(reply)
    }

    /// Streamed exchange: yields reply fragments as they arrive upstream.
    ///
    /// The stream ends after the exchange has been recorded. A failed
    /// exchange yields one final `Err`; an empty reply yields nothing. In
    /// both cases history is left as it was before the call.
    pub async fn stream(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<FragmentStream, GenerationError> {
        let permit = self.exchanges.acquire(session_id).await;

        let mut contents = self.history.get_or_create(session_id);
        contents.push(Turn::user(text));
        let request = GenerationRequest::new(self.system_instruction.clone(), contents);

        debug!(
            session = session_id,
            provider = self.provider.display_name(),
            turns = request.contents.len(),
            text = %truncate_string(text, 80),
            "starting exchange"
        );

        let upstream = self.provider.stream_generate(request).await.map_err(|e| {
            warn!(session = session_id, error = %e, "upstream call failed");
            e
        })?;

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let history = self.history.clone();
        let session = session_id.to_string();
        let user_text = text.to_string();
        tokio::spawn(async move {
            relay(upstream, &tx, &history, &session, user_text).await;
            // Free the session before the consumer sees end-of-stream.
            drop(permit);
            drop(tx);
        });

        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Drain `upstream` into `tx`, then record the exchange in `history`.
async fn relay(
    mut upstream: FragmentStream,
    tx: &mpsc::Sender<Result<String, GenerationError>>,
    history: &HistoryStore,
    session: &str,
    user_text: String,
) {
    let mut reply = String::new();
    let mut fragments = 0usize;
    let mut listening = true;

    while let Some(item) = upstream.next().await {
        match item {
            Ok(fragment) => {
                reply.push_str(&fragment);
                fragments += 1;
                if listening && tx.send(Ok(fragment)).await.is_err() {
                    debug!(session, "consumer went away, draining upstream");
                    listening = false;
                }
            }
            Err(e) => {
                warn!(session, fragments, error = %e, "upstream stream failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }

    if reply.is_empty() {
        warn!(session, "upstream returned no text; exchange not recorded");
        return;
    }

    history.record_exchange(session, user_text, reply);
    info!(session, fragments, "exchange complete");
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
