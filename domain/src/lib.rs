//! Domain layer for llm-ensemble
//!
//! This crate contains the core entities, value objects and pure logic of an
//! ensemble run. It has no dependencies on infrastructure or presentation
//! concerns.
//!
//! # Core Concepts
//!
//! - **Branch**: one provider+model generation within a run, identified by
//!   its configuration id
//! - **Agreement**: pairwise cosine similarity of branch response embeddings
//! - **Consensus**: the answer a designated summarizer synthesizes from all
//!   usable branch responses
//! - **Event stream**: the ordered [`EnsembleEvent`]s a client consumes

pub mod core;
pub mod ensemble;
pub mod prompt;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use crate::core::{error::DomainError, prompt::Prompt, provider::ProviderKind};
pub use ensemble::{
    agreement::{AgreementScore, cosine_similarity, pairwise_scores, usable_entries},
    branch::{BranchPhase, BranchState, ERROR_PREFIX, error_text, is_usable_text},
    configuration::{Credentials, ModelConfiguration, SummarizerSpec},
    event::EnsembleEvent,
    request::{ConfigurationInput, EnsembleRequest, EnsembleRun, RequestLimits},
    result::{BranchTexts, RunResult},
};
pub use prompt::template::{ConsensusPrompt, NO_VALID_RESPONSES};
pub use session::stream::StreamEvent;
