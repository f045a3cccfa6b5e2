//! Domain error types

use thiserror::Error;

/// Request-shape violations.
///
/// Any of these rejects an ensemble run before the event stream opens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Between {min} and {max} configurations are required, got {actual}")]
    ConfigurationCount {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Duplicate configuration id: {0}")]
    DuplicateConfigurationId(String),

    #[error("Configuration id cannot be empty")]
    EmptyConfigurationId,

    #[error("Missing API key for configuration: {0}")]
    MissingKey(String),

    #[error("Missing model for configuration: {0}")]
    MissingModel(String),

    #[error("Model name cannot be empty for configuration: {0}")]
    EmptyModelName(String),

    #[error("Summarizer references unknown configuration: {0}")]
    UnknownSummarizer(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_count_display() {
        let error = DomainError::ConfigurationCount {
            min: 2,
            max: 8,
            actual: 1,
        };
        assert_eq!(
            error.to_string(),
            "Between 2 and 8 configurations are required, got 1"
        );
    }

    #[test]
    fn test_missing_key_names_configuration() {
        let error = DomainError::MissingKey("gpt".to_string());
        assert!(error.to_string().contains("gpt"));
    }
}
