//! Gemini provider: talks to the `streamGenerateContent` endpoint over SSE.
//!
//! Every call is streamed (`?alt=sse`); buffered generation just joins the
//! fragments, so both modes see exactly the same upstream output.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use mitran_core::config::schema::{Config, ModelConfig};
use mitran_core::types::Turn;

use crate::error::GenerationError;
use crate::traits::{FragmentStream, GenerationProvider, GenerationRequest};

/// Harm categories that get an explicit safety threshold on every request.
const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ─────────────────────────────────────────────
// Wire format (request)
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<TextPart>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Content {
            role: turn.role.upstream_name(),
            parts: vec![TextPart {
                text: turn.text.clone(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: i32,
}

// ─────────────────────────────────────────────
// Wire format (response chunks)
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Decode one SSE `data:` payload into the visible text it carries.
///
/// Returns `Ok(None)` for chunks without text (usage-only chunks, thought
/// summaries, grounding metadata).
fn decode_chunk(data: &str) -> Result<Option<String>, GenerationError> {
    let chunk: GenerateContentResponse = serde_json::from_str(data)?;

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::Blocked(reason));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

// ─────────────────────────────────────────────
// GeminiProvider
// ─────────────────────────────────────────────

/// Upstream client for the Gemini API.
pub struct GeminiProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://generativelanguage.googleapis.com/v1beta"`).
    api_base: String,
    api_key: String,
    /// Model and request knobs.
    model: ModelConfig,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base", &self.api_base)
            .field("model", &self.model.name)
            .field("google_search", &self.model.google_search)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: ModelConfig,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(GeminiProvider {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model,
        })
    }

    /// Build the full streaming URL for the configured model.
    fn stream_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/models/{}:streamGenerateContent?alt=sse", base, self.model.name)
    }

    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let system_instruction = request
            .system_instruction
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| SystemInstruction {
                parts: vec![TextPart {
                    text: s.to_string(),
                }],
            });

        let tools = if self.model.google_search {
            vec![Tool {
                google_search: serde_json::json!({}),
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents: request.contents.iter().map(Content::from).collect(),
            system_instruction,
            tools,
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: self.model.safety_threshold.clone(),
                })
                .collect(),
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.model.thinking_budget,
                },
            },
        }
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError> {
        debug!(
            provider = "Gemini",
            model = %self.model.name,
            turns = request.contents.len(),
            search = self.model.google_search,
            "Calling upstream"
        );

        let body = self.build_body(&request);

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| error!(provider = "Gemini", error = %e, "HTTP request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(provider = "Gemini", status = %status, body = %body, "API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let fragments = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => decode_chunk(&event.data).transpose(),
                    Err(e) => Some(Err(GenerationError::Stream(e.to_string()))),
                }
            });

        Ok(fragments.boxed())
    }

    fn model(&self) -> &str {
        &self.model.name
    }

    fn display_name(&self) -> &str {
        "Gemini"
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build a `GeminiProvider` from the loaded configuration.
///
/// Fails when the credential variable named by `provider.apiKeyEnv` is unset.
pub fn create_provider(config: &Config) -> Result<GeminiProvider, GenerationError> {
    let api_key = config
        .provider
        .api_key()
        .ok_or_else(|| GenerationError::MissingApiKey(config.provider.api_key_env.clone()))?;

    debug!(
        model = %config.model.name,
        api_base = %config.provider.api_base,
        "Creating Gemini provider"
    );

    GeminiProvider::new(api_key, &config.provider.api_base, config.model.clone())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STREAM_PATH: &str = "/models/gemini-2.5-flash:streamGenerateContent";

    fn make_provider(base: &str, google_search: bool) -> GeminiProvider {
        let model = ModelConfig {
            google_search,
            ..ModelConfig::default()
        };
        GeminiProvider::new("test-key-123", base, model).unwrap()
    }

    /// Drain a streamed generation into one string.
    async fn collect_text(
        provider: &GeminiProvider,
        request: GenerationRequest,
    ) -> Result<String, GenerationError> {
        let fragments: Vec<String> = provider.stream_generate(request).await?.try_collect().await?;
        Ok(fragments.concat())
    }

    fn sse_body(chunks: &[serde_json::Value]) -> String {
        chunks
            .iter()
            .map(|c| format!("data: {}\r\n\r\n", c))
            .collect()
    }

    fn text_chunk(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    fn request(text: &str) -> GenerationRequest {
        GenerationRequest::new(None, vec![Turn::user(text)])
    }

    // ── Unit tests ──

    #[test]
    fn test_stream_url_trailing_slash() {
        let provider = make_provider("https://example.com/v1beta/", true);
        assert_eq!(
            provider.stream_url(),
            "https://example.com/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_body_maps_roles_and_settings() {
        let provider = make_provider("http://localhost", true);
        let req = GenerationRequest::new(
            Some("Be kind.".to_string()),
            vec![Turn::user("hi"), Turn::assistant("hello"), Turn::user("bye")],
        );
        let body = serde_json::to_value(provider.build_body(&req)).unwrap();

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "bye");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be kind.");
        assert_eq!(body["tools"][0]["googleSearch"], serde_json::json!({}));
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], -1);
    }

    #[test]
    fn test_body_omits_empty_prompt_and_disabled_tools() {
        let provider = make_provider("http://localhost", false);
        let req = GenerationRequest::new(Some("  ".to_string()), vec![Turn::user("hi")]);
        let body = serde_json::to_value(provider.build_body(&req)).unwrap();

        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_decode_chunk_skips_thoughts() {
        let data = serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "pondering...", "thought": true },
                    { "text": "Hello " },
                    { "text": "there" }
                ]}
            }]
        })
        .to_string();
        assert_eq!(decode_chunk(&data).unwrap().as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_decode_chunk_without_text() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":9}}"#;
        assert!(decode_chunk(data).unwrap().is_none());
    }

    #[test]
    fn test_decode_chunk_blocked() {
        let data = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(decode_chunk(data), Err(GenerationError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_decode_chunk_malformed() {
        assert!(matches!(decode_chunk("{not json"), Err(GenerationError::Decode(_))));
    }

    #[test]
    fn test_create_provider_requires_key() {
        let mut config = Config::default();
        config.provider.api_key_env = "MITRAN_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = create_provider(&config).unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey(ref name) if name == "MITRAN_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn test_stream_fragments_in_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key-123"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&[text_chunk("Woof, "), text_chunk("hello "), text_chunk("friend!")]),
                "text/event-stream",
            ))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri(), true);
        let fragments: Vec<String> = provider
            .stream_generate(request("Hi"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(fragments, vec!["Woof, ", "hello ", "friend!"]);
    }

    #[tokio::test]
    async fn test_stream_joins_text_skipping_metadata() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&[
                    text_chunk("The answer "),
                    serde_json::json!({ "usageMetadata": { "totalTokenCount": 12 } }),
                    text_chunk("is 42."),
                ]),
                "text/event-stream",
            ))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri(), false);
        let text = collect_text(&provider, request("Question?")).await.unwrap();
        assert_eq!(text, "The answer is 42.");
    }

    #[tokio::test]
    async fn test_sends_history_and_system_instruction() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .and(body_partial_json(serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "first" }] },
                    { "role": "model", "parts": [{ "text": "reply" }] },
                    { "role": "user", "parts": [{ "text": "second" }] }
                ],
                "systemInstruction": { "parts": [{ "text": "You are Mitran." }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&[text_chunk("ok")]),
                "text/event-stream",
            ))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri(), true);
        let req = GenerationRequest::new(
            Some("You are Mitran.".to_string()),
            vec![Turn::user("first"), Turn::assistant("reply"), Turn::user("second")],
        );

        // If the body matcher fails, wiremock returns 404 → we'd get an error
        assert_eq!(collect_text(&provider, req).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Resource has been exhausted" }
            })))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri(), true);
        let err = provider.stream_generate(request("Hi")).await.err().unwrap();

        match err {
            GenerationError::Api { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("exhausted"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blocked_prompt_mid_stream() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&[serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } })]),
                "text/event-stream",
            ))
            .mount(&mock_server)
            .await;

        let provider = make_provider(&mock_server.uri(), true);
        let err = collect_text(&provider, request("Hi")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Blocked(_)));
    }

    #[tokio::test]
    async fn test_network_error() {
        // Point to a port that's not listening
        let provider = make_provider("http://127.0.0.1:1", true);
        let err = collect_text(&provider, request("Hello")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Http(_)));
    }
}
