use async_trait::async_trait;
use mission_core::{ExecutionHandle, PlanResult, SimulationResult, StatusResult};

use crate::error::Result;
use crate::types::PlanRequest;

/// The four phases of the mission protocol.
///
/// Implementations perform exactly one request per call and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait MissionApi: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResult>;

    async fn simulate(&self, plan: &PlanResult) -> Result<SimulationResult>;

    async fn execute(&self, plan: &PlanResult, approvals: &[String]) -> Result<ExecutionHandle>;

    async fn status(&self, handle: &ExecutionHandle) -> Result<StatusResult>;
}
