//! Shared handler state

use ensemble_application::RunEnsembleUseCase;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub use_case: Arc<RunEnsembleUseCase>,
}

impl AppState {
    pub fn new(use_case: RunEnsembleUseCase) -> Self {
        Self {
            use_case: Arc::new(use_case),
        }
    }
}
