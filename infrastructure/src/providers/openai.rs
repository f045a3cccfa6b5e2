//! OpenAI chat-completions adapter
//!
//! Also serves Grok (X.AI), which exposes the same API shape at a different
//! base URL but has no embeddings endpoint.

use super::sse::{SseStep, parse_json, pump_sse};
use super::{ProviderSettings, STREAM_BUFFER, check_status, transport_error};
use async_trait::async_trait;
use ensemble_application::{ProviderAdapter, ProviderError, StreamHandle};
use ensemble_domain::ProviderKind;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    settings: ProviderSettings,
    kind: ProviderKind,
}

impl OpenAiAdapter {
    pub fn openai(client: Client, api_key: String, settings: ProviderSettings) -> Self {
        Self {
            client,
            api_key,
            settings,
            kind: ProviderKind::OpenAi,
        }
    }

    /// Grok speaks the OpenAI dialect; embeddings are never offered.
    pub fn grok(client: Client, api_key: String, settings: ProviderSettings) -> Self {
        Self {
            client,
            api_key,
            settings: ProviderSettings {
                embedding_model: None,
                ..settings
            },
            kind: ProviderKind::Grok,
        }
    }

    fn chat_request<'a>(&self, prompt: &'a str, model: &'a str, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream,
        }
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let provider = self.kind.as_str();
        let url = self.settings.url(path);
        debug!(provider, url = %url, "Sending request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        check_status(provider, response).await
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ProviderError> {
        let response = self
            .post("/v1/chat/completions", &self.chat_request(prompt, model, false))
            .await?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("{} response: {e}", self.kind)))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<StreamHandle, ProviderError> {
        let response = self
            .post("/v1/chat/completions", &self.chat_request(prompt, model, true))
            .await?;

        let (tx, handle) = StreamHandle::channel(STREAM_BUFFER);
        let provider = self.kind.as_str();
        tokio::spawn(async move {
            pump_sse(response, tx, provider, |payload| {
                parse_stream_payload(provider, payload)
            })
            .await;
        });

        Ok(handle)
    }

    fn supports_embeddings(&self) -> bool {
        self.settings.embedding_model.is_some()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let Some(model) = self.settings.embedding_model.as_deref() else {
            return Ok(Vec::new());
        };
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .post("/v1/embeddings", &EmbeddingRequest { model, input: texts })
            .await?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("{} embeddings: {e}", self.kind)))?;

        let mut data = body.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Interpret one `data:` payload of a chat-completions stream.
fn parse_stream_payload(provider: &str, payload: &str) -> SseStep {
    if payload.trim() == "[DONE]" {
        return SseStep::Done;
    }

    let chunk: ChatChunk = match parse_json(payload, provider) {
        Ok(chunk) => chunk,
        Err(step) => return step,
    };

    if let Some(error) = chunk.error {
        return SseStep::Error(format!("{provider} stream error: {}", error.message));
    }

    match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(text) if !text.is_empty() => SseStep::Delta(text),
        _ => SseStep::Skip,
    }
}

// ==================== Wire Types ====================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::StreamEvent;
    use mockito::Matcher;
    use serde_json::json;

    fn adapter(url: &str, kind: ProviderKind) -> OpenAiAdapter {
        let settings = ProviderSettings {
            base_url: url.to_string(),
            ..ProviderSettings::defaults_for(kind)
        };
        match kind {
            ProviderKind::Grok => OpenAiAdapter::grok(Client::new(), "test-key".into(), settings),
            _ => OpenAiAdapter::openai(Client::new(), "test-key".into(), settings),
        }
    }

    async fn drain(mut handle: StreamHandle) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = handle.next().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_generate_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "messages": [{ "role": "user", "content": "Capital of France?" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Paris."}}]}"#)
            .create_async()
            .await;

        let text = adapter(&server.url(), ProviderKind::OpenAi)
            .generate("Capital of France?", "gpt-4o")
            .await
            .unwrap();

        assert_eq!(text, "Paris.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stream_yields_deltas_then_completed() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Par\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"is.\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({ "stream": true })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let handle = adapter(&server.url(), ProviderKind::OpenAi)
            .generate_stream("q", "gpt-4o")
            .await
            .unwrap();

        assert_eq!(
            drain(handle).await,
            vec![
                StreamEvent::Delta("Par".to_string()),
                StreamEvent::Delta("is.".to_string()),
                StreamEvent::Completed("Paris.".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_in_stream_error_ends_stream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(concat!(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Pa\"}}]}\n\n",
                "data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
            ))
            .create_async()
            .await;

        let handle = adapter(&server.url(), ProviderKind::Grok)
            .generate_stream("q", "grok-2")
            .await
            .unwrap();
        let events = drain(handle).await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            StreamEvent::Error("grok stream error: overloaded".to_string())
        );
    }

    #[tokio::test]
    async fn test_http_error_carries_vendor_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;

        let err = adapter(&server.url(), ProviderKind::OpenAi)
            .generate_stream("q", "gpt-4o")
            .await
            .err()
            .unwrap();

        assert_eq!(
            err,
            ProviderError::Http {
                provider: "openai".to_string(),
                status: 401,
                message: "Incorrect API key provided".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_embeddings_batched_and_ordered_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_body(Matcher::PartialJson(json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"]
            })))
            .with_status(200)
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let vectors = adapter(&server.url(), ProviderKind::OpenAi)
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_grok_has_no_embeddings() {
        let server = mockito::Server::new_async().await;
        let grok = adapter(&server.url(), ProviderKind::Grok);

        assert!(!grok.supports_embeddings());
        assert!(grok.embed(&["x".to_string()]).await.unwrap().is_empty());
    }

    #[test]
    fn test_parse_stream_payload() {
        assert_eq!(parse_stream_payload("openai", "[DONE]"), SseStep::Done);
        assert_eq!(
            parse_stream_payload("openai", r#"{"choices":[]}"#),
            SseStep::Skip
        );
        assert!(matches!(
            parse_stream_payload("openai", "{not json"),
            SseStep::Error(_)
        ));
    }
}
