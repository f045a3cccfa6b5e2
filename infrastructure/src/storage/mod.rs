//! Storage infrastructure: persistence of finished runs
//!
//! Provides [`JsonlResultStore`], an append-only JSONL writer that implements
//! the [`ResultStore`](ensemble_application::ResultStore) port.

mod jsonl_store;

pub use jsonl_store::JsonlResultStore;
