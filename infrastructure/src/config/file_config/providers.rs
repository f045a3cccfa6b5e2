//! Provider configuration from TOML (`[providers]` section)
//!
//! API keys are never read from configuration; they arrive with each request.
//! Every field is optional and falls back to the adapter's built-in value.

use crate::providers::ProviderSettings;
use ensemble_domain::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Connection overrides for one vendor (`[providers.<name>]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Base URL (e.g. a proxy or a compatible self-hosted endpoint)
    pub base_url: Option<String>,
    /// Max tokens per response (Anthropic requires it on every request)
    pub max_tokens: Option<u32>,
    /// Embedding model (OpenAI and Google only)
    pub embedding_model: Option<String>,
    /// Whole-request timeout in seconds, including the streamed body
    pub request_timeout_secs: Option<u64>,
}

impl FileProviderConfig {
    pub fn to_settings(&self, kind: ProviderKind) -> ProviderSettings {
        let defaults = ProviderSettings::defaults_for(kind);
        ProviderSettings {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            embedding_model: if kind.supports_embeddings() {
                self.embedding_model.clone().or(defaults.embedding_model)
            } else {
                None
            },
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub openai: FileProviderConfig,
    pub google: FileProviderConfig,
    pub anthropic: FileProviderConfig,
    pub grok: FileProviderConfig,
}

impl FileProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> &FileProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Google => &self.google,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Grok => &self.grok,
        }
    }

    /// Resolved settings for every provider kind.
    pub fn to_settings(&self) -> HashMap<ProviderKind, ProviderSettings> {
        ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind).to_settings(kind)))
            .collect()
    }
}
