//! Per-branch lifecycle state

use serde::{Deserialize, Serialize};

/// Prefix that marks a branch text as an error placeholder.
pub const ERROR_PREFIX: &str = "Error: ";

/// Build the placeholder text stored for a failed branch.
pub fn error_text(message: &str) -> String {
    format!("{ERROR_PREFIX}{message}")
}

/// Whether a text has content for agreement scoring and consensus.
///
/// Failed branches are excluded by [`BranchState::is_usable`], never by
/// inspecting the text, so an answer that happens to start with
/// [`ERROR_PREFIX`] still counts.
pub fn is_usable_text(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Phase of a single branch.
///
/// `Pending -> (Manual | Generating) -> (Complete | Error)`; `Manual`,
/// `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPhase {
    Pending,
    Generating,
    Complete,
    Error,
    Manual,
}

impl BranchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BranchPhase::Complete | BranchPhase::Error | BranchPhase::Manual
        )
    }
}

/// Mutable state owned by one branch task for the duration of a run.
///
/// Transitions out of a terminal phase are ignored and reported as `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchState {
    accumulated_text: String,
    phase: BranchPhase,
    error_message: Option<String>,
}

impl Default for BranchState {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchState {
    pub fn new() -> Self {
        Self {
            accumulated_text: String::new(),
            phase: BranchPhase::Pending,
            error_message: None,
        }
    }

    pub fn phase(&self) -> BranchPhase {
        self.phase
    }

    pub fn text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn into_text(self) -> String {
        self.accumulated_text
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Whether the final text may feed agreement scoring and consensus.
    pub fn is_usable(&self) -> bool {
        self.phase != BranchPhase::Error && is_usable_text(&self.accumulated_text)
    }

    pub fn start_generating(&mut self) -> bool {
        if self.phase != BranchPhase::Pending {
            return false;
        }
        self.phase = BranchPhase::Generating;
        true
    }

    /// Append a streamed fragment. Only valid while generating.
    pub fn append(&mut self, fragment: &str) -> bool {
        if self.phase != BranchPhase::Generating {
            return false;
        }
        self.accumulated_text.push_str(fragment);
        true
    }

    /// Short-circuit with a pre-supplied text.
    pub fn manual(&mut self, text: impl Into<String>) -> bool {
        if self.phase != BranchPhase::Pending {
            return false;
        }
        self.accumulated_text = text.into();
        self.phase = BranchPhase::Manual;
        true
    }

    pub fn complete(&mut self) -> bool {
        if self.phase != BranchPhase::Generating {
            return false;
        }
        self.phase = BranchPhase::Complete;
        true
    }

    /// Fail the branch, replacing any partial text with the error placeholder.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        let message = message.into();
        self.accumulated_text = error_text(&message);
        self.error_message = Some(message);
        self.phase = BranchPhase::Error;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generating_accumulates_in_order() {
        let mut state = BranchState::new();
        assert!(state.start_generating());
        assert!(state.append("Par"));
        assert!(state.append("is"));
        assert!(state.complete());
        assert_eq!(state.text(), "Paris");
        assert_eq!(state.phase(), BranchPhase::Complete);
    }

    #[test]
    fn test_append_rejected_before_start() {
        let mut state = BranchState::new();
        assert!(!state.append("x"));
        assert_eq!(state.text(), "");
    }

    #[test]
    fn test_failure_replaces_partial_text() {
        let mut state = BranchState::new();
        state.start_generating();
        state.append("partial");
        assert!(state.fail("rate limited"));
        assert_eq!(state.text(), "Error: rate limited");
        assert_eq!(state.error_message(), Some("rate limited"));
        assert!(!state.is_usable());
    }

    #[test]
    fn test_terminal_phase_never_reverts() {
        let mut state = BranchState::new();
        assert!(state.manual("supplied"));
        assert!(!state.start_generating());
        assert!(!state.fail("late"));
        assert!(!state.complete());
        assert_eq!(state.phase(), BranchPhase::Manual);
        assert_eq!(state.text(), "supplied");
    }

    #[test]
    fn test_usable_text() {
        assert!(is_usable_text("Paris"));
        assert!(!is_usable_text(""));
        assert!(!is_usable_text("   "));
    }

    #[test]
    fn test_usability_follows_phase_not_prefix() {
        let mut answered = BranchState::new();
        answered.start_generating();
        answered.append("Error: the premise is wrong, Paris is the capital.");
        answered.complete();
        assert!(answered.is_usable());

        let mut blank = BranchState::new();
        blank.manual("  ");
        assert_eq!(blank.phase(), BranchPhase::Manual);
        assert!(!blank.is_usable());
    }
}
