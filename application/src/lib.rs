//! Application layer for llm-ensemble
//!
//! This crate contains the orchestration use cases, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::EnsembleParams;
pub use ports::{
    event_sink::{EventSink, SinkClosed},
    provider::{ProviderAdapter, ProviderError, StreamHandle},
    provider_factory::ProviderFactory,
    result_store::{NoResultStore, ResultStore},
};
pub use use_cases::run_ensemble::{RunEnsembleError, RunEnsembleUseCase};
pub use use_cases::score_agreement::{AgreementOutcome, AgreementScorer};
