use serde::{Deserialize, Serialize};
use std::fmt;

use super::scalar::{opt_string_or_number, string_list};
use crate::error::{CoreError, Result};

/// Run identifier returned by the execute call.
///
/// A handle is the only key used for status polls. Each successful execute
/// call yields a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(run_id: impl Into<String>) -> Result<Self> {
        let run_id = run_id.into();
        if run_id.trim().is_empty() {
            return Err(CoreError::InvalidRunId(run_id));
        }
        Ok(Self(run_id))
    }

    pub fn run_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    #[serde(alias = "queued")]
    Pending,
    #[serde(alias = "in_progress")]
    Running,
    #[serde(alias = "success", alias = "completed", alias = "done")]
    Succeeded,
    #[serde(alias = "error", alias = "failure")]
    Failed,
    /// Any state this client does not recognize; treated as still in flight.
    #[serde(other)]
    Unknown,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifacts the service reports for a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReceipts {
    #[serde(default, alias = "jobId", deserialize_with = "opt_string_or_number")]
    pub job_id: Option<String>,
    #[serde(
        default,
        alias = "planId",
        alias = "plan_hash",
        alias = "planHash",
        deserialize_with = "opt_string_or_number"
    )]
    pub plan_id: Option<String>,
    #[serde(default, alias = "tx_hashes", alias = "txHashes", deserialize_with = "string_list")]
    pub txs: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub cids: Vec<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub reward: Option<String>,
    #[serde(
        default,
        alias = "rewardToken",
        alias = "token",
        deserialize_with = "opt_string_or_number"
    )]
    pub reward_token: Option<String>,
    #[serde(default, alias = "netPayout", deserialize_with = "opt_string_or_number")]
    pub net_payout: Option<String>,
}

/// One snapshot of a run, as returned by the status call.
///
/// Each poll yields a wholly new value; snapshots are never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    #[serde(default, alias = "runId", skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(alias = "status")]
    pub state: RunState,
    #[serde(
        default,
        alias = "step",
        alias = "currentStep",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_step: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub logs: Vec<String>,
    #[serde(default, alias = "receipt", skip_serializing_if = "Option::is_none")]
    pub receipts: Option<RunReceipts>,
}

impl StatusResult {
    pub fn new(state: RunState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn with_receipts(mut self, receipts: RunReceipts) -> Self {
        self.receipts = Some(receipts);
        self
    }
}
