//! Branch configuration value objects

use crate::core::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One branch of the fan-out: which provider and model answer the prompt.
///
/// `id` is the correlation key carried by every event about this branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfiguration {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub provider: ProviderKind,
    #[serde(rename = "model")]
    pub model_name: String,
}

impl ModelConfiguration {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: ProviderKind,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            provider,
            model_name: model_name.into(),
        }
    }
}

/// Which configuration's credential and which model run the consensus phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizerSpec {
    pub config_id: String,
    pub provider: ProviderKind,
    pub model: String,
}

impl SummarizerSpec {
    pub fn new(
        config_id: impl Into<String>,
        provider: ProviderKind,
        model: impl Into<String>,
    ) -> Self {
        Self {
            config_id: config_id.into(),
            provider,
            model: model.into(),
        }
    }
}

/// API keys by configuration id.
///
/// `Debug` never prints the secrets.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: HashMap<String, String>,
}

impl Credentials {
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }

    pub fn get(&self, config_id: &str) -> Option<&str> {
        self.keys.get(config_id).map(String::as_str)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.keys.keys().collect();
        ids.sort();
        f.debug_struct("Credentials")
            .field("ids", &ids)
            .field("keys", &"<redacted>")
            .finish()
    }
}
