//! HTTP client for a running Mitran server, used by `mitran chat`.

use anyhow::{bail, Context, Result};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

pub struct ChatRemote {
    base_url: String,
    http: reqwest::Client,
}

impl ChatRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `text` on the streaming endpoint, handing each fragment to
    /// `on_fragment` as it arrives. Returns the assembled reply.
    pub async fn stream_reply(
        &self,
        session_id: &str,
        text: &str,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<String> {
        let url = format!("{}/v1/chat/stream", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "session_id": session_id, "text": text }))
            .send()
            .await
            .with_context(|| format!("cannot reach {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => bail!("{} ({})", envelope.error.message, envelope.error.code),
                Err(_) => bail!("server returned {status}: {body}"),
            }
        }

        let mut reply = String::new();
        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.context("broken event stream")?;
            match event.event.as_str() {
                "error" => {
                    let detail: ErrorDetail = serde_json::from_str(&event.data)
                        .unwrap_or(ErrorDetail {
                            code: "UNKNOWN".to_string(),
                            message: event.data.clone(),
                        });
                    bail!("{} ({})", detail.message, detail.code);
                }
                "message" | "" => {
                    on_fragment(&event.data);
                    reply.push_str(&event.data);
                }
                other => debug!(event = other, "ignoring unknown event"),
            }
        }

        Ok(reply)
    }
}
