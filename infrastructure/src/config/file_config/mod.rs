//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section has defaults, so an empty file is a valid configuration.

mod ensemble;
mod logging;
mod providers;
mod server;
mod storage;

pub use ensemble::FileEnsembleConfig;
pub use logging::FileLoggingConfig;
pub use providers::{FileProviderConfig, FileProvidersConfig};
pub use server::FileServerConfig;
pub use storage::FileStorageConfig;

use ensemble_domain::ProviderKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("server.bind: '{0}' is not a socket address")]
    InvalidBind(String),

    #[error("ensemble.min_configurations must be at least 1")]
    ZeroMinConfigurations,

    #[error("ensemble.min_configurations ({min}) exceeds max_configurations ({max})")]
    ConfigurationBounds { min: usize, max: usize },

    #[error("ensemble.event_buffer cannot be 0")]
    ZeroEventBuffer,

    #[error("providers.{provider}.base_url cannot be empty")]
    EmptyBaseUrl { provider: &'static str },

    #[error("providers.{provider}.max_tokens cannot be 0")]
    ZeroMaxTokens { provider: &'static str },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// HTTP listener settings
    pub server: FileServerConfig,
    /// Orchestration timeouts and limits
    pub ensemble: FileEnsembleConfig,
    /// Per-vendor connection settings
    pub providers: FileProvidersConfig,
    /// Optional persistence of finished runs
    pub storage: FileStorageConfig,
    /// Log level and optional log file
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected problems.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.server.socket_addr().is_err() {
            errors.push(ConfigValidationError::InvalidBind(self.server.bind.clone()));
        }

        let ensemble = &self.ensemble;
        if ensemble.min_configurations == 0 {
            errors.push(ConfigValidationError::ZeroMinConfigurations);
        }
        if ensemble.min_configurations > ensemble.max_configurations {
            errors.push(ConfigValidationError::ConfigurationBounds {
                min: ensemble.min_configurations,
                max: ensemble.max_configurations,
            });
        }
        if ensemble.event_buffer == 0 {
            errors.push(ConfigValidationError::ZeroEventBuffer);
        }

        for kind in ProviderKind::ALL {
            let provider = self.providers.get(kind);
            if provider
                .base_url
                .as_deref()
                .is_some_and(|url| url.trim().is_empty())
            {
                errors.push(ConfigValidationError::EmptyBaseUrl {
                    provider: kind.as_str(),
                });
            }
            if provider.max_tokens == Some(0) {
                errors.push(ConfigValidationError::ZeroMaxTokens {
                    provider: kind.as_str(),
                });
            }
        }

        errors
    }
}
