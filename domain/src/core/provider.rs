//! Provider value object identifying an LLM vendor backend

use super::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// LLM vendor backends an ensemble branch can run against (Value Object)
///
/// The set is closed: every variant maps to exactly one concrete adapter
/// in the infrastructure layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Google,
    Anthropic,
    Grok,
}

impl ProviderKind {
    /// All known providers, in embedding preference order first.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Google,
        ProviderKind::Anthropic,
        ProviderKind::Grok,
    ];

    /// Get the wire identifier for this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Grok => "grok",
        }
    }

    /// Human readable vendor name
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Google => "Google",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Grok => "Grok",
        }
    }

    /// Whether the vendor exposes an embeddings endpoint
    pub fn supports_embeddings(&self) -> bool {
        matches!(self, ProviderKind::OpenAi | ProviderKind::Google)
    }

    /// Rank used when choosing the adapter for agreement scoring (lower wins).
    pub fn embedding_preference(&self) -> Option<u8> {
        match self {
            ProviderKind::OpenAi => Some(0),
            ProviderKind::Google => Some(1),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "grok" | "xai" => Ok(ProviderKind::Grok),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}

impl Serialize for ProviderKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
