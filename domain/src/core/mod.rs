//! Core domain concepts shared by every ensemble run

pub mod error;
pub mod prompt;
pub mod provider;
