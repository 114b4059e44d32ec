use mission_core::{ErrorCategory, Stage};
use thiserror::Error;

/// Errors returned by orchestrator operations.
///
/// Service failures are not errors at this level: they move the mission into
/// [`Stage::Error`] with a classified message. These variants cover caller
/// precondition violations and local storage failures.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("No plan is held; submit a mission first")]
    NoPlan,

    #[error("No non-blocking simulation is held; simulate the plan first")]
    NoSimulation,

    #[error("Mission is busy ({0})")]
    Busy(Stage),

    #[error("Nothing to retry")]
    NothingToRetry,

    #[error("A {0} failure cannot be retried")]
    NotRetryable(ErrorCategory),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn invalid_transition(from: Stage, to: Stage) -> Self {
        Self::InvalidTransition { from, to }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
