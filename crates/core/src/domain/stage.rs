use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Stage of the mission orchestration state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Planning,
    Planned,
    Simulating,
    AwaitingExecute,
    Executing,
    Completed,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Planned => "planned",
            Self::Simulating => "simulating",
            Self::AwaitingExecute => "awaiting_execute",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "planning" => Some(Self::Planning),
            "planned" => Some(Self::Planned),
            "simulating" => Some(Self::Simulating),
            "awaiting_execute" => Some(Self::AwaitingExecute),
            "executing" => Some(Self::Executing),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// A remote call is outstanding while in this stage.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Planning | Self::Simulating | Self::Executing)
    }

    /// Stages from which a new mission may be submitted.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, Self::Idle | Self::Completed | Self::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidStage(s.to_string()))
    }
}
