use mission_core::Stage;

use crate::error::{OrchestratorError, Result};

pub struct StageMachine;

impl StageMachine {
    pub fn validate_transition(from: Stage, to: Stage) -> Result<()> {
        if Self::allowed_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(OrchestratorError::invalid_transition(from, to))
        }
    }

    fn allowed_transitions(from: Stage) -> &'static [Stage] {
        match from {
            Stage::Idle => &[Stage::Planning],
            Stage::Planning => &[Stage::Idle, Stage::Planned, Stage::Error],
            // Executing directly from Planned only happens with the simulate gate disabled.
            Stage::Planned => &[Stage::Simulating, Stage::Executing, Stage::Idle],
            Stage::Simulating => &[Stage::AwaitingExecute, Stage::Error, Stage::Idle],
            Stage::AwaitingExecute => &[Stage::Executing, Stage::Idle],
            Stage::Executing => &[Stage::Completed, Stage::Error, Stage::Idle],
            Stage::Completed => &[Stage::Planning, Stage::Idle],
            Stage::Error => &[Stage::Planning, Stage::Idle],
        }
    }

    pub fn can_transition(from: Stage, to: Stage) -> bool {
        Self::validate_transition(from, to).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 8] = [
        Stage::Idle,
        Stage::Planning,
        Stage::Planned,
        Stage::Simulating,
        Stage::AwaitingExecute,
        Stage::Executing,
        Stage::Completed,
        Stage::Error,
    ];

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            Stage::Idle,
            Stage::Planning,
            Stage::Planned,
            Stage::Simulating,
            Stage::AwaitingExecute,
            Stage::Executing,
            Stage::Completed,
        ];
        for pair in path.windows(2) {
            assert!(
                StageMachine::can_transition(pair[0], pair[1]),
                "{} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_error_only_reaches_idle_or_planning() {
        for to in ALL {
            let allowed = StageMachine::can_transition(Stage::Error, to);
            assert_eq!(allowed, matches!(to, Stage::Idle | Stage::Planning), "error -> {}", to);
        }
    }

    #[test]
    fn test_blocking_simulation_cannot_reach_execution() {
        assert!(!StageMachine::can_transition(Stage::Simulating, Stage::Executing));
        assert!(!StageMachine::can_transition(Stage::Error, Stage::AwaitingExecute));
        assert!(!StageMachine::can_transition(Stage::Idle, Stage::Executing));
    }

    #[test]
    fn test_missing_fields_returns_to_idle() {
        assert!(StageMachine::can_transition(Stage::Planning, Stage::Idle));
        assert!(!StageMachine::can_transition(Stage::Planning, Stage::Simulating));
    }

    #[test]
    fn test_no_self_transitions() {
        for stage in ALL {
            assert!(!StageMachine::can_transition(stage, stage), "{}", stage);
        }
    }
}
