//! HTTP provider adapters
//!
//! One adapter per vendor API shape. OpenAI and Grok share the
//! chat-completions dialect; Google and Anthropic have their own.
//! [`HttpProviderFactory`] is the closed mapping from [`ProviderKind`] to
//! adapter used by the orchestrator.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod sse;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use openai::OpenAiAdapter;

use ensemble_application::{ProviderAdapter, ProviderError, ProviderFactory};
use ensemble_domain::ProviderKind;
use ensemble_domain::util::truncate_for_display;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Longest vendor error body quoted inside an error message.
const MAX_ERROR_BODY: usize = 300;

/// Capacity of the fragment channel between a producer task and its handle.
const STREAM_BUFFER: usize = 64;

/// Per-vendor connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub max_tokens: u32,
    /// `None` for vendors without an embeddings endpoint.
    pub embedding_model: Option<String>,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    /// Built-in settings for `kind`.
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let (base_url, embedding_model) = match kind {
            ProviderKind::OpenAi => ("https://api.openai.com", Some("text-embedding-3-small")),
            ProviderKind::Grok => ("https://api.x.ai", None),
            ProviderKind::Google => (
                "https://generativelanguage.googleapis.com",
                Some("text-embedding-004"),
            ),
            ProviderKind::Anthropic => ("https://api.anthropic.com", None),
        };
        Self {
            base_url: base_url.to_string(),
            max_tokens: 4096,
            embedding_model: embedding_model.map(str::to_string),
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Join the base URL with an absolute API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Builds reqwest-backed adapters for every [`ProviderKind`].
///
/// Holds one [`Client`] per kind; every adapter of that kind clones it and
/// so shares its connection pool.
pub struct HttpProviderFactory {
    settings: HashMap<ProviderKind, ProviderSettings>,
    clients: HashMap<ProviderKind, Client>,
}

impl HttpProviderFactory {
    /// Kinds missing from `settings` use [`ProviderSettings::defaults_for`].
    pub fn new(mut settings: HashMap<ProviderKind, ProviderSettings>) -> Result<Self, ProviderError> {
        let mut clients = HashMap::new();
        for kind in ProviderKind::ALL {
            let kind_settings = settings
                .entry(kind)
                .or_insert_with(|| ProviderSettings::defaults_for(kind));
            clients.insert(kind, http_client(kind_settings)?);
        }
        Ok(Self { settings, clients })
    }

    pub fn settings(&self, kind: ProviderKind) -> ProviderSettings {
        self.settings
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ProviderSettings::defaults_for(kind))
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(
        &self,
        kind: ProviderKind,
        api_key: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(format!(
                "missing API key for {}",
                kind.display_name()
            )));
        }

        let settings = self.settings(kind);
        let client = match self.clients.get(&kind) {
            Some(client) => client.clone(),
            None => http_client(&settings)?,
        };
        let api_key = api_key.to_string();

        Ok(match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiAdapter::openai(client, api_key, settings)),
            ProviderKind::Grok => Arc::new(OpenAiAdapter::grok(client, api_key, settings)),
            ProviderKind::Google => Arc::new(GoogleAdapter::new(client, api_key, settings)),
            ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(client, api_key, settings)),
        })
    }
}

fn http_client(settings: &ProviderSettings) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .map_err(|e| ProviderError::Configuration(format!("Failed to create HTTP client: {e}")))
}

fn transport_error(provider: &str, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Transport(format!("{provider} request timed out"))
    } else {
        ProviderError::Transport(format!("{provider} request failed: {e}"))
    }
}

/// Pass successful responses through; turn anything else into an
/// [`ProviderError::Http`] carrying the (truncated) vendor body.
async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        provider: provider.to_string(),
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Prefer the vendor's `error.message` field over the raw body.
fn error_message(body: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });
    truncate_for_display(extracted.as_deref().unwrap_or(body), MAX_ERROR_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_configuration_error() {
        let factory = HttpProviderFactory::new(HashMap::new()).unwrap();
        let err = factory.create(ProviderKind::OpenAi, "  ").err().unwrap();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_factory_maps_every_kind() {
        let factory = HttpProviderFactory::new(HashMap::new()).unwrap();
        for kind in ProviderKind::ALL {
            let adapter = factory.create(kind, "test-key").unwrap();
            assert_eq!(adapter.kind(), kind);
            assert_eq!(adapter.supports_embeddings(), kind.supports_embeddings());
        }
    }

    #[test]
    fn test_clients_built_once_per_kind() {
        let factory = HttpProviderFactory::new(HashMap::new()).unwrap();
        assert_eq!(factory.clients.len(), ProviderKind::ALL.len());

        // branches and the summarizer reuse the pooled client
        for _ in 0..3 {
            factory.create(ProviderKind::Google, "test-key").unwrap();
        }
        assert_eq!(factory.clients.len(), ProviderKind::ALL.len());
    }

    #[test]
    fn test_overrides_keep_other_defaults() {
        let mut custom = ProviderSettings::defaults_for(ProviderKind::Anthropic);
        custom.max_tokens = 1024;
        let factory =
            HttpProviderFactory::new(HashMap::from([(ProviderKind::Anthropic, custom)])).unwrap();

        assert_eq!(factory.settings(ProviderKind::Anthropic).max_tokens, 1024);
        assert_eq!(
            factory.settings(ProviderKind::Grok).base_url,
            "https://api.x.ai"
        );
    }

    #[test]
    fn test_url_join_tolerates_trailing_slash() {
        let mut settings = ProviderSettings::defaults_for(ProviderKind::OpenAi);
        settings.base_url = "http://localhost:1234/".to_string();
        assert_eq!(
            settings.url("/v1/embeddings"),
            "http://localhost:1234/v1/embeddings"
        );
    }

    #[test]
    fn test_error_message_prefers_vendor_field() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"auth"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
