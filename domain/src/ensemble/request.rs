//! Incoming ensemble request and its validated form
//!
//! [`EnsembleRequest`] mirrors the JSON body a client submits. Calling
//! [`EnsembleRequest::validate`] enforces the request-shape invariants and
//! produces an [`EnsembleRun`], the immutable input of one orchestration run.

use super::configuration::{Credentials, ModelConfiguration, SummarizerSpec};
use crate::core::error::DomainError;
use crate::core::prompt::Prompt;
use crate::core::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Bounds on how many configurations a single run may fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub min_configurations: usize,
    pub max_configurations: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            min_configurations: 2,
            max_configurations: 8,
        }
    }
}

/// A configuration entry as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationInput {
    pub id: String,
    pub name: String,
    pub provider: ProviderKind,
    /// Informational only; the `models` map decides the model actually used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Raw request body for one ensemble run.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleRequest {
    pub prompt: String,
    pub configurations: Vec<ConfigurationInput>,
    pub keys: HashMap<String, String>,
    pub models: HashMap<String, String>,
    pub summarizer: SummarizerSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_responses: Option<BTreeMap<String, String>>,
}

impl std::fmt::Debug for EnsembleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleRequest")
            .field("prompt", &self.prompt)
            .field("configurations", &self.configurations)
            .field("keys", &"<redacted>")
            .field("models", &self.models)
            .field("summarizer", &self.summarizer)
            .field("existing_responses", &self.existing_responses)
            .finish()
    }
}

impl EnsembleRequest {
    /// Validate shape and build the run input.
    ///
    /// Checks, in order: non-empty prompt, configuration count within
    /// `limits`, unique non-empty ids, a key and a non-empty model for every
    /// configuration, and that the summarizer references a configuration.
    pub fn validate(self, limits: RequestLimits) -> Result<EnsembleRun, DomainError> {
        let prompt = Prompt::new(self.prompt)?;

        let count = self.configurations.len();
        if count < limits.min_configurations || count > limits.max_configurations {
            return Err(DomainError::ConfigurationCount {
                min: limits.min_configurations,
                max: limits.max_configurations,
                actual: count,
            });
        }

        let mut seen = HashSet::new();
        let mut configurations = Vec::with_capacity(count);
        for input in self.configurations {
            if input.id.trim().is_empty() {
                return Err(DomainError::EmptyConfigurationId);
            }
            if !seen.insert(input.id.clone()) {
                return Err(DomainError::DuplicateConfigurationId(input.id));
            }
            if !self.keys.contains_key(&input.id) {
                return Err(DomainError::MissingKey(input.id));
            }
            let model_name = match self.models.get(&input.id) {
                Some(m) if m.trim().is_empty() => {
                    return Err(DomainError::EmptyModelName(input.id));
                }
                Some(m) => m.clone(),
                None => return Err(DomainError::MissingModel(input.id)),
            };
            configurations.push(ModelConfiguration::new(
                input.id,
                input.name,
                input.provider,
                model_name,
            ));
        }

        if !seen.contains(&self.summarizer.config_id) {
            return Err(DomainError::UnknownSummarizer(self.summarizer.config_id));
        }

        Ok(EnsembleRun {
            prompt,
            configurations,
            credentials: Credentials::new(self.keys),
            summarizer: self.summarizer,
            existing_responses: self.existing_responses.unwrap_or_default(),
        })
    }
}

/// Validated, immutable input of one orchestration run.
#[derive(Debug, Clone)]
pub struct EnsembleRun {
    pub prompt: Prompt,
    pub configurations: Vec<ModelConfiguration>,
    pub credentials: Credentials,
    pub summarizer: SummarizerSpec,
    pub existing_responses: BTreeMap<String, String>,
}

impl EnsembleRun {
    /// The pre-supplied text for a configured branch.
    ///
    /// Any present entry short-circuits generation, blank ones included.
    pub fn manual_response(&self, config_id: &str) -> Option<&str> {
        self.existing_responses.get(config_id).map(String::as_str)
    }

    /// Existing responses whose id matches no configuration, in key order.
    ///
    /// These never generate; they only feed agreement scoring and consensus.
    pub fn manual_only_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.existing_responses
            .iter()
            .filter(|(id, _)| !self.configurations.iter().any(|c| &c.id == *id))
            .map(|(id, text)| (id.as_str(), text.as_str()))
    }
}
