//! Provider factory port
//!
//! Maps a provider kind plus credential to a ready adapter. The concrete
//! factory is a closed match over [`ProviderKind`] in the infrastructure
//! layer; tests inject their own.

use super::provider::{ProviderAdapter, ProviderError};
use ensemble_domain::ProviderKind;
use std::sync::Arc;

pub trait ProviderFactory: Send + Sync {
    /// Build an adapter for `kind` authenticated with `api_key`.
    ///
    /// Construction performs no network I/O.
    fn create(
        &self,
        kind: ProviderKind,
        api_key: &str,
    ) -> Result<Arc<dyn ProviderAdapter>, ProviderError>;
}
