//! Router and request handlers.
//!
//! | Method      | Path                | Purpose                                   |
//! |-------------|---------------------|-------------------------------------------|
//! | GET         | `/`                 | chat page                                 |
//! | GET         | `/health`           | liveness                                  |
//! | POST / GET  | `/v1/sessions`      | mint a session id / list known sessions   |
//! | POST        | `/v1/chat/send`     | buffered reply                            |
//! | POST / GET  | `/v1/chat/stream`   | reply as `text/event-stream`              |
//! | GET / DELETE| `/v1/chat/history`  | read / clear one session's history        |
//! | POST        | `/chat`             | legacy buffered endpoint                  |

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use mitran_agent::ChatClient;
use mitran_core::history::SessionSummary;
use mitran_core::types::Turn;
use mitran_providers::{FragmentStream, GenerationError};

use crate::error::ApiError;
use crate::ui;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ChatClient>,
    /// Whether grounding with web search is on; shown in the page caption.
    pub google_search: bool,
}

impl AppState {
    pub fn new(client: Arc<ChatClient>, google_search: bool) -> Self {
        Self {
            client,
            google_search,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health))
        .route("/v1/sessions", post(create_session).get(list_sessions))
        .route("/v1/chat/send", post(send_message))
        .route("/v1/chat/stream", post(stream_post).get(stream_get))
        .route("/v1/chat/history", get(get_history).delete(clear_history))
        .route("/chat", post(legacy_chat))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────
// Request / response bodies
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

/// Body of the legacy `POST /chat` endpoint.
#[derive(Debug, Deserialize)]
pub struct LegacyChatRequest {
    pub session_id: String,
    pub message: String,
    /// Accepted for compatibility; the reply is always buffered.
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextReply {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryReply {
    pub messages: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = uuid::Uuid::new_v4().to_string();
    state.client.history().get_or_create(&session_id);
    debug!(session = %session_id, "session created");
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionList> {
    Json(SessionList {
        sessions: state.client.history().list_sessions(),
    })
}

async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<TextReply>, ApiError> {
    require("session_id", &req.session_id)?;
    require("text", &req.text)?;
    let text = state.client.generate(&req.session_id, &req.text).await?;
    Ok(Json(TextReply { text }))
}

async fn stream_post(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    open_stream(&state, &req.session_id, &req.text).await
}

async fn stream_get(
    State(state): State<AppState>,
    Query(req): Query<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    open_stream(&state, &req.session_id, &req.text).await
}

async fn open_stream(
    state: &AppState,
    session_id: &str,
    text: &str,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require("session_id", session_id)?;
    require("text", text)?;
    let fragments = state.client.stream(session_id, text).await?;
    Ok(sse_response(fragments))
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<HistoryReply>, ApiError> {
    require("session_id", &query.session_id)?;
    let messages = state.client.history().get_or_create(&query.session_id);
    Ok(Json(HistoryReply { messages }))
}

async fn clear_history(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require("session_id", &query.session_id)?;
    state.client.history().clear(&query.session_id);
    debug!(session = %query.session_id, "history cleared");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

async fn legacy_chat(
    State(state): State<AppState>,
    Json(req): Json<LegacyChatRequest>,
) -> Result<Json<TextReply>, ApiError> {
    require("session_id", &req.session_id)?;
    require("message", &req.message)?;
    if req.stream {
        debug!("stream flag on /chat ignored");
    }
    let text = state.client.generate(&req.session_id, &req.message).await?;
    Ok(Json(TextReply { text }))
}

// ─────────────────────────────────────────────
// SSE framing
// ─────────────────────────────────────────────

/// One `data:` event per fragment; a mid-stream failure becomes a final
/// `event: error` frame carrying the error code and message.
fn sse_response(fragments: FragmentStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = fragments.map(|item| {
        Ok::<_, Infallible>(match item {
            Ok(fragment) => fragment_event(&fragment),
            Err(e) => error_event(&e),
        })
    });
    Sse::new(events)
}

/// SSE field values may not carry carriage returns; fold them into `\n`
/// so multi-line fragments go out as consecutive `data:` lines.
fn fragment_event(fragment: &str) -> Event {
    let normalized = fragment.replace("\r\n", "\n").replace('\r', "\n");
    Event::default().data(normalized)
}

fn error_event(error: &GenerationError) -> Event {
    let payload = serde_json::json!({
        "code": error.code(),
        "message": error.to_string(),
    });
    Event::default().event("error").data(payload.to_string())
}
