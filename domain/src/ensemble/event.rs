//! Lifecycle events of an ensemble run
//!
//! [`EnsembleEvent`] is the event vocabulary clients consume. Every variant
//! serializes to a JSON object whose `type` field is the discriminant:
//!
//! | type | fields |
//! |---|---|
//! | `status` | `message` |
//! | `config_start` | `configId`, `name` |
//! | `chunk` | `configId`, `content`, `name` |
//! | `config_complete` | `configId`, `name`, `response` |
//! | `config_error` | `configId`, `name`, `error` |
//! | `agreement_start` | |
//! | `agreement` | `scores` |
//! | `agreement_error` | `error` |
//! | `consensus_start` | |
//! | `consensus_chunk` | `content` |
//! | `consensus_error` | `error` |
//! | `complete` | `consensusResponse`, `agreementScores`, `individualResponses`, `configurations` |

use super::agreement::AgreementScore;
use super::result::RunResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EnsembleEvent {
    Status {
        message: String,
    },
    ConfigStart {
        config_id: String,
        name: String,
    },
    Chunk {
        config_id: String,
        content: String,
        name: String,
    },
    ConfigComplete {
        config_id: String,
        name: String,
        response: String,
    },
    ConfigError {
        config_id: String,
        name: String,
        error: String,
    },
    AgreementStart,
    Agreement {
        scores: Vec<AgreementScore>,
    },
    AgreementError {
        error: String,
    },
    ConsensusStart,
    ConsensusChunk {
        content: String,
    },
    ConsensusError {
        error: String,
    },
    Complete(RunResult),
}

impl EnsembleEvent {
    /// The wire discriminant of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            EnsembleEvent::Status { .. } => "status",
            EnsembleEvent::ConfigStart { .. } => "config_start",
            EnsembleEvent::Chunk { .. } => "chunk",
            EnsembleEvent::ConfigComplete { .. } => "config_complete",
            EnsembleEvent::ConfigError { .. } => "config_error",
            EnsembleEvent::AgreementStart => "agreement_start",
            EnsembleEvent::Agreement { .. } => "agreement",
            EnsembleEvent::AgreementError { .. } => "agreement_error",
            EnsembleEvent::ConsensusStart => "consensus_start",
            EnsembleEvent::ConsensusChunk { .. } => "consensus_chunk",
            EnsembleEvent::ConsensusError { .. } => "consensus_error",
            EnsembleEvent::Complete(_) => "complete",
        }
    }

    /// The branch this event belongs to, for branch-scoped events.
    pub fn config_id(&self) -> Option<&str> {
        match self {
            EnsembleEvent::ConfigStart { config_id, .. }
            | EnsembleEvent::Chunk { config_id, .. }
            | EnsembleEvent::ConfigComplete { config_id, .. }
            | EnsembleEvent::ConfigError { config_id, .. } => Some(config_id),
            _ => None,
        }
    }

    /// Whether this event ends a branch.
    pub fn is_branch_terminal(&self) -> bool {
        matches!(
            self,
            EnsembleEvent::ConfigComplete { .. } | EnsembleEvent::ConfigError { .. }
        )
    }

    pub fn status(message: impl Into<String>) -> Self {
        EnsembleEvent::Status {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::result::BranchTexts;
    use serde_json::json;

    #[test]
    fn test_chunk_wire_shape() {
        let event = EnsembleEvent::Chunk {
            config_id: "a".to_string(),
            content: "Par".to_string(),
            name: "GPT".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "type": "chunk", "configId": "a", "content": "Par", "name": "GPT" })
        );
    }

    #[test]
    fn test_unit_events_carry_only_type() {
        assert_eq!(
            serde_json::to_value(EnsembleEvent::AgreementStart).unwrap(),
            json!({ "type": "agreement_start" })
        );
        assert_eq!(
            serde_json::to_value(EnsembleEvent::ConsensusStart).unwrap(),
            json!({ "type": "consensus_start" })
        );
    }

    #[test]
    fn test_complete_flattens_result() {
        let event = EnsembleEvent::Complete(RunResult {
            consensus_response: "c".to_string(),
            agreement_scores: vec![],
            individual_responses: BranchTexts::new(),
            configurations: vec![],
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["consensusResponse"], "c");
        assert!(value["agreementScores"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_kind_matches_serialized_type() {
        let events = vec![
            EnsembleEvent::status("hi"),
            EnsembleEvent::ConfigError {
                config_id: "a".to_string(),
                name: "A".to_string(),
                error: "boom".to_string(),
            },
            EnsembleEvent::Agreement { scores: vec![] },
            EnsembleEvent::ConsensusChunk {
                content: "x".to_string(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }

    #[test]
    fn test_config_id_only_for_branch_events() {
        let start = EnsembleEvent::ConfigStart {
            config_id: "a".to_string(),
            name: "A".to_string(),
        };
        assert_eq!(start.config_id(), Some("a"));
        assert!(!start.is_branch_terminal());
        assert_eq!(EnsembleEvent::ConsensusStart.config_id(), None);
    }

    #[test]
    fn test_deserialize_from_wire() {
        let event: EnsembleEvent =
            serde_json::from_value(json!({ "type": "consensus_error", "error": "down" })).unwrap();
        assert_eq!(
            event,
            EnsembleEvent::ConsensusError {
                error: "down".to_string()
            }
        );
    }
}
