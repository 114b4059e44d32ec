use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::plan::{PlanResult, SimulationResult};
use super::run::StatusResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry of the interaction transcript rendered by a presentation layer.
///
/// Plan and simulation results are shared with the orchestrator that holds
/// them, not copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEntry {
    Text { role: Role, content: String },
    Plan { plan: Arc<PlanResult> },
    Simulation { simulation: Arc<SimulationResult> },
    Status { status: StatusResult },
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self::Text {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Text {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Plan { .. } => "plan",
            Self::Simulation { .. } => "simulation",
            Self::Status { .. } => "status",
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Role and content for text entries.
    pub fn as_text(&self) -> Option<(Role, &str)> {
        match self {
            Self::Text { role, content } => Some((*role, content)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::RunState;
    use serde_json::json;

    #[test]
    fn test_entry_tagging() {
        let entry = TranscriptEntry::user("label 500 images");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "text");
        assert_eq!(value["role"], "user");

        let entry = TranscriptEntry::Status {
            status: StatusResult::new(RunState::Running),
        };
        assert_eq!(entry.kind(), "status");
        assert!(entry.is_status());
        assert!(entry.as_text().is_none());
    }

    #[test]
    fn test_plan_entry_shares_result() {
        let plan = Arc::new(PlanResult::new(json!({"reward": "45"})));
        let entry = TranscriptEntry::Plan {
            plan: Arc::clone(&plan),
        };

        match entry {
            TranscriptEntry::Plan { plan: held } => assert!(Arc::ptr_eq(&held, &plan)),
            other => panic!("unexpected entry: {:?}", other),
        }
    }
}
