//! Ensemble parameters for orchestration control
//!
//! [`EnsembleParams`] groups the static parameters that bound one run of
//! [`RunEnsembleUseCase`](crate::use_cases::run_ensemble::RunEnsembleUseCase):
//! timeouts, event buffering and request limits.

use ensemble_domain::RequestLimits;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleParams {
    /// Upper bound on one branch's generation. `None` waits forever.
    pub branch_timeout: Option<Duration>,
    /// Upper bound on the consensus generation. `None` waits forever.
    pub summarizer_timeout: Option<Duration>,
    /// Capacity of the event channel between run tasks and the writer.
    pub event_buffer: usize,
    /// Allowed configuration count per request.
    pub limits: RequestLimits,
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self {
            branch_timeout: Some(Duration::from_secs(120)),
            summarizer_timeout: Some(Duration::from_secs(180)),
            event_buffer: 64,
            limits: RequestLimits::default(),
        }
    }
}

impl EnsembleParams {
    // ==================== Builder Methods ====================

    pub fn with_branch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.branch_timeout = timeout;
        self
    }

    pub fn with_summarizer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.summarizer_timeout = timeout;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    pub fn with_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Seconds-based constructor where `0` means "no timeout".
    pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = EnsembleParams::default();
        assert_eq!(params.branch_timeout, Some(Duration::from_secs(120)));
        assert_eq!(params.limits.min_configurations, 2);
        assert_eq!(params.limits.max_configurations, 8);
    }

    #[test]
    fn test_zero_seconds_disables_timeout() {
        assert_eq!(EnsembleParams::timeout_from_secs(0), None);
        assert_eq!(
            EnsembleParams::timeout_from_secs(5),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_event_buffer_never_zero() {
        assert_eq!(EnsembleParams::default().with_event_buffer(0).event_buffer, 1);
    }
}
