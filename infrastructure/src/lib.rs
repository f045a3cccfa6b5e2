//! Infrastructure layer for llm-ensemble
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: vendor HTTP clients, configuration file
//! loading and result storage.

pub mod config;
pub mod providers;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use providers::{
    AnthropicAdapter, GoogleAdapter, HttpProviderFactory, OpenAiAdapter, ProviderSettings,
};
pub use storage::JsonlResultStore;
