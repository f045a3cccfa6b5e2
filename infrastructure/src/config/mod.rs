//! Configuration file loading for llm-ensemble
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ENSEMBLE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./ensemble.toml` or `./.ensemble.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/llm-ensemble/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileEnsembleConfig, FileLoggingConfig,
    FileProviderConfig, FileProvidersConfig, FileServerConfig, FileStorageConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
