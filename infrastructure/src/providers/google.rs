//! Google Generative Language (Gemini) adapter

use super::sse::{SseStep, parse_json, pump_sse};
use super::{ProviderSettings, STREAM_BUFFER, check_status, transport_error};
use async_trait::async_trait;
use ensemble_application::{ProviderAdapter, ProviderError, StreamHandle};
use ensemble_domain::ProviderKind;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "google";

pub struct GoogleAdapter {
    client: Client,
    api_key: String,
    settings: ProviderSettings,
}

impl GoogleAdapter {
    pub fn new(client: Client, api_key: String, settings: ProviderSettings) -> Self {
        Self {
            client,
            api_key,
            settings,
        }
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = self.settings.url(path);
        debug!(provider = PROVIDER, url = %url, "Sending request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        check_status(PROVIDER, response).await
    }
}

fn generate_request(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: prompt }],
        }],
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ProviderError> {
        let path = format!("/v1beta/models/{model}:generateContent");
        let response = self.post(&path, &generate_request(prompt)).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("google response: {e}")))?;

        Ok(body.text())
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<StreamHandle, ProviderError> {
        let path = format!("/v1beta/models/{model}:streamGenerateContent?alt=sse");
        let response = self.post(&path, &generate_request(prompt)).await?;

        let (tx, handle) = StreamHandle::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            pump_sse(response, tx, PROVIDER, parse_stream_payload).await;
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

        let model_ref = format!("models/{model}");
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &model_ref,
                    content: Content {
                        role: None,
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let path = format!("/v1beta/models/{model}:batchEmbedContents");
        let response = self.post(&path, &request).await?;

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("google embeddings: {e}")))?;

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

/// Each streamed payload is a partial `GenerateContentResponse`; the body
/// simply ends when generation is done.
fn parse_stream_payload(payload: &str) -> SseStep {
    let chunk: GenerateResponse = match parse_json(payload, PROVIDER) {
        Ok(chunk) => chunk,
        Err(step) => return step,
    };

    if let Some(error) = chunk.error {
        return SseStep::Error(format!("google stream error: {}", error.message));
    }

    let text = chunk.text();
    if text.is_empty() {
        SseStep::Skip
    } else {
        SseStep::Delta(text)
    }
}

// ==================== Wire Types ====================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}
