//! Ensemble run model: configurations, branch state, agreement, events

pub mod agreement;
pub mod branch;
pub mod configuration;
pub mod event;
pub mod request;
pub mod result;
