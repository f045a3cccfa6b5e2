//! Anthropic Messages API adapter
//!
//! Streaming uses typed SSE events; only `content_block_delta` carries text.
//! Anthropic has no embeddings endpoint.

use super::sse::{SseStep, parse_json, pump_sse};
use super::{ProviderSettings, STREAM_BUFFER, check_status, transport_error};
use async_trait::async_trait;
use ensemble_application::{ProviderAdapter, ProviderError, StreamHandle};
use ensemble_domain::ProviderKind;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    settings: ProviderSettings,
}

impl AnthropicAdapter {
    pub fn new(client: Client, api_key: String, settings: ProviderSettings) -> Self {
        Self {
            client,
            api_key,
            settings,
        }
    }

    fn messages_request<'a>(&self, prompt: &'a str, model: &'a str, stream: bool) -> MessagesRequest<'a> {
        MessagesRequest {
            model,
            max_tokens: self.settings.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream,
        }
    }

    async fn post(&self, body: &MessagesRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        let url = self.settings.url("/v1/messages");
        debug!(provider = PROVIDER, url = %url, stream = body.stream, "Sending request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        check_status(PROVIDER, response).await
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ProviderError> {
        let response = self
            .post(&self.messages_request(prompt, model, false))
            .await?;

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("anthropic response: {e}")))?;

        Ok(body
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<StreamHandle, ProviderError> {
        let response = self
            .post(&self.messages_request(prompt, model, true))
            .await?;

        let (tx, handle) = StreamHandle::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            pump_sse(response, tx, PROVIDER, parse_stream_payload).await;
        });

        Ok(handle)
    }
}

fn parse_stream_payload(payload: &str) -> SseStep {
    let event: StreamPayload = match parse_json(payload, PROVIDER) {
        Ok(event) => event,
        Err(step) => return step,
    };

    match event.event_type.as_str() {
        "content_block_delta" => match event.delta.and_then(|d| d.text) {
            Some(text) if !text.is_empty() => SseStep::Delta(text),
            _ => SseStep::Skip,
        },
        "message_stop" => SseStep::Done,
        "error" => {
            let message = event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown error".to_string());
            SseStep::Error(format!("anthropic stream error: {message}"))
        }
        // message_start, content_block_start/stop, message_delta, ping
        _ => SseStep::Skip,
    }
}

// ==================== Wire Types ====================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}
