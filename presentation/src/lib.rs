//! Presentation layer for llm-ensemble
//!
//! This crate contains CLI definitions, the event wire protocol, the HTTP
//! surface and the terminal event writer.

pub mod cli;
pub mod http;
pub mod output;
pub mod wire;

// Re-export commonly used types
pub use cli::commands::{Cli, Command};
pub use http::{AppState, router, serve};
pub use output::write_events;
pub use wire::EventEncoder;
