//! Prompt construction

pub mod template;
