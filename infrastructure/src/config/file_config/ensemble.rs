//! Orchestration settings from TOML (`[ensemble]` section)

use ensemble_application::EnsembleParams;
use ensemble_domain::RequestLimits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEnsembleConfig {
    /// Per-branch generation limit in seconds; 0 disables it
    pub branch_timeout_secs: u64,
    /// Consensus generation limit in seconds; 0 disables it
    pub summarizer_timeout_secs: u64,
    /// Events buffered between the run and the client writer
    pub event_buffer: usize,
    pub min_configurations: usize,
    pub max_configurations: usize,
}

impl Default for FileEnsembleConfig {
    fn default() -> Self {
        Self {
            branch_timeout_secs: 120,
            summarizer_timeout_secs: 180,
            event_buffer: 64,
            min_configurations: 2,
            max_configurations: 8,
        }
    }
}

impl FileEnsembleConfig {
    pub fn to_params(&self) -> EnsembleParams {
        EnsembleParams::default()
            .with_branch_timeout(EnsembleParams::timeout_from_secs(self.branch_timeout_secs))
            .with_summarizer_timeout(EnsembleParams::timeout_from_secs(
                self.summarizer_timeout_secs,
            ))
            .with_event_buffer(self.event_buffer)
            .with_limits(RequestLimits {
                min_configurations: self.min_configurations,
                max_configurations: self.max_configurations,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_to_params() {
        let config = FileEnsembleConfig {
            branch_timeout_secs: 0,
            summarizer_timeout_secs: 30,
            max_configurations: 4,
            ..Default::default()
        };
        let params = config.to_params();
        assert_eq!(params.branch_timeout, None);
        assert_eq!(params.summarizer_timeout, Some(Duration::from_secs(30)));
        assert_eq!(params.limits.max_configurations, 4);
        assert_eq!(params.event_buffer, 64);
    }
}
