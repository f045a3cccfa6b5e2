//! Ports (interfaces) for external dependencies
//!
//! These traits define how the application layer interacts with
//! provider backends, the client event stream and result storage.

pub mod event_sink;
pub mod provider;
pub mod provider_factory;
pub mod result_store;
