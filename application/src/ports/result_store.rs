//! Port for persisting finished runs.
//!
//! A store receives each [`RunResult`] after its `complete` event was sent.
//! `store` is synchronous and non-fallible so a storage problem can never
//! disturb the run; implementations log their own failures.

use ensemble_domain::RunResult;

pub trait ResultStore: Send + Sync {
    /// Record a finished run.
    fn store(&self, result: &RunResult);
}

/// No-op implementation for tests and when storage is disabled.
pub struct NoResultStore;

impl ResultStore for NoResultStore {
    fn store(&self, _result: &RunResult) {}
}
