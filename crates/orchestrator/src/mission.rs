//! Mission Orchestrator
//!
//! Drives one mission through plan, simulate, execute and status polling.
//! Service failures never escape as `Err`: they are classified, appended to
//! the transcript and move the mission into [`Stage::Error`]. `Err` is
//! reserved for calls made in the wrong stage.

use events::{Event, EventBus};
use mission_client::{MissionApi, PlanRequest};
use mission_core::{
    ClassifiedError, ErrorClassifier, ExecutionHandle, Failure, PlanResult, SimulationResult,
    Stage, TranscriptEntry,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::poller::{PollOutcome, StatusPoller};
use crate::receipt_store::ReceiptStore;
use crate::state_machine::StageMachine;
use crate::transcript::Transcript;

pub struct MissionOrchestrator {
    id: Uuid,
    api: Arc<dyn MissionApi>,
    config: OrchestratorConfig,
    stage: Stage,
    transcript: Transcript,
    receipts: ReceiptStore,
    plan: Option<Arc<PlanResult>>,
    simulation: Option<Arc<SimulationResult>>,
    handle: Option<ExecutionHandle>,
    last_error: Option<ClassifiedError>,
    /// Plan request of the latest submission, re-sent verbatim by `retry`.
    last_request: Option<PlanRequest>,
    token: CancellationToken,
    event_bus: Option<EventBus>,
}

impl MissionOrchestrator {
    pub fn new(api: Arc<dyn MissionApi>, config: OrchestratorConfig, receipts: ReceiptStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            api,
            config,
            stage: Stage::Idle,
            transcript: Transcript::new(),
            receipts,
            plan: None,
            simulation: None,
            handle: None,
            last_error: None,
            last_request: None,
            token: CancellationToken::new(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.transcript = std::mem::take(&mut self.transcript).with_publisher(bus.clone(), self.id);
        self.event_bus = Some(bus);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn receipts(&self) -> &ReceiptStore {
        &self.receipts
    }

    pub fn plan(&self) -> Option<&Arc<PlanResult>> {
        self.plan.as_ref()
    }

    pub fn simulation(&self) -> Option<&Arc<SimulationResult>> {
        self.simulation.as_ref()
    }

    /// Handle of the most recent run, if execute returned one.
    pub fn handle(&self) -> Option<&ExecutionHandle> {
        self.handle.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClassifiedError> {
        self.last_error.as_ref()
    }

    /// Token observed by the next status poller.
    ///
    /// Cancelling it while [`execute`](Self::execute) is polling stops the
    /// poller and returns the mission to idle.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Submit a mission description and request a plan.
    ///
    /// Blank text is ignored. Submitting while a plan is held discards it.
    pub async fn submit(&mut self, text: &str) -> Result<Stage> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self.stage);
        }
        if self.stage.is_busy() {
            return Err(OrchestratorError::Busy(self.stage));
        }
        if !self.stage.accepts_submit() {
            debug!(mission_id = %self.id, stage = %self.stage, "Discarding held plan for new submission");
            self.discard_plan();
            self.transition(Stage::Idle)?;
        }

        let mut request = PlanRequest::new(text);
        if let Some(expert) = self.config.expert {
            request = request.with_expert(expert);
        }
        if self.config.send_history {
            request = request.with_history(self.transcript.text_history());
        }

        self.transcript.push(TranscriptEntry::user(text));
        self.request_plan(request).await
    }

    async fn request_plan(&mut self, request: PlanRequest) -> Result<Stage> {
        self.last_error = None;
        self.discard_plan();
        self.transition(Stage::Planning)?;

        let result = self.api.plan(&request).await;
        self.last_request = Some(request);

        match result {
            Ok(plan) => {
                let plan = Arc::new(plan);
                self.transcript.push(TranscriptEntry::Plan {
                    plan: Arc::clone(&plan),
                });

                if plan.is_complete() {
                    info!(mission_id = %self.id, "Plan ready");
                    self.plan = Some(plan);
                    self.transition(Stage::Planned)?;
                } else {
                    info!(
                        mission_id = %self.id,
                        missing = plan.missing_fields.len(),
                        "Plan is missing required fields"
                    );
                    self.transcript.push(TranscriptEntry::assistant(format!(
                        "I need a few more details before planning: {}.",
                        plan.missing_fields.join(", ")
                    )));
                    self.transition(Stage::Idle)?;
                }
            }
            Err(e) => {
                self.fail(&e.failure(), Some("Planning failed. Please try again."))?;
            }
        }

        Ok(self.stage)
    }

    /// Simulate the held plan.
    ///
    /// A blocking simulation moves the mission into the error stage; it is
    /// never held for execution.
    pub async fn simulate(&mut self) -> Result<Stage> {
        StageMachine::validate_transition(self.stage, Stage::Simulating)?;
        let plan = self.plan.clone().ok_or(OrchestratorError::NoPlan)?;

        self.simulation = None;
        self.transition(Stage::Simulating)?;

        match self.api.simulate(&plan).await {
            Ok(simulation) => {
                let simulation = Arc::new(simulation);
                self.transcript.push(TranscriptEntry::Simulation {
                    simulation: Arc::clone(&simulation),
                });

                if simulation.is_blocking() {
                    let failure = if simulation.blockers.is_empty() {
                        Failure::new("Simulation reports the plan is over budget")
                            .with_code("OVER_BUDGET")
                    } else {
                        Failure::new(simulation.blockers.join(", "))
                            .with_code("GUARDRAIL_BLOCKED")
                            .with_blockers(simulation.blockers.clone())
                    };
                    self.fail(&failure, None)?;
                } else {
                    self.simulation = Some(simulation);
                    self.transition(Stage::AwaitingExecute)?;
                }
            }
            Err(e) => {
                self.fail(&e.failure(), Some("Simulation failed. Please try again."))?;
            }
        }

        Ok(self.stage)
    }

    /// Execute the held plan and poll the run to a terminal state.
    pub async fn execute(&mut self) -> Result<Stage> {
        StageMachine::validate_transition(self.stage, Stage::Executing)?;
        let plan = self.plan.clone().ok_or(OrchestratorError::NoPlan)?;

        let approvals = match &self.simulation {
            Some(simulation) if !simulation.is_blocking() => simulation.confirmations.clone(),
            Some(_) => return Err(OrchestratorError::NoSimulation),
            None if self.config.require_simulation => return Err(OrchestratorError::NoSimulation),
            None => Vec::new(),
        };

        self.handle = None;
        self.transcript.begin_run();
        self.transition(Stage::Executing)?;

        let handle = match self.api.execute(&plan, &approvals).await {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(&e.failure(), Some("Execution failed. Please try again."))?;
                return Ok(self.stage);
            }
        };

        info!(mission_id = %self.id, run_id = %handle, "Run started");
        self.handle = Some(handle.clone());

        let poller = StatusPoller::new(
            Arc::clone(&self.api),
            handle,
            self.config.poll,
            self.token.clone(),
        )
        .with_receipt_links(self.config.links.clone(), plan.plan_hash.clone());

        match poller.run(&mut self.transcript, &mut self.receipts).await {
            PollOutcome::Succeeded(receipt) => {
                self.publish(Event::ReceiptStored {
                    mission_id: self.id,
                    run_id: receipt.id.clone(),
                    job_id: receipt.job_id.clone(),
                });
                let summary = match &receipt.job_id {
                    Some(job_id) => format!("Mission complete. Job {} receipt stored.", job_id),
                    None => "Mission complete. Receipt stored.".to_string(),
                };
                self.transcript.push(TranscriptEntry::assistant(summary));
                self.discard_plan();
                self.transition(Stage::Completed)?;
            }
            PollOutcome::Failed(status) => {
                let detail = status.logs.last().cloned().unwrap_or_default();
                self.fail(&Failure::new(detail).with_code("RUN_FAILED"), None)?;
            }
            PollOutcome::TimedOut { attempts } => {
                let failure = Failure::new(format!("No terminal state after {} polls", attempts))
                    .with_code("POLL_TIMEOUT");
                self.fail(&failure, None)?;
            }
            PollOutcome::Cancelled => {
                self.cancel();
            }
        }

        Ok(self.stage)
    }

    /// Re-send the last plan request after a retryable error.
    ///
    /// The request goes out exactly as first sent and no new user entry is
    /// appended. Run failures, guardrail blocks and configuration errors are
    /// refused: they need a new mission, a revised plan or a fixed setup.
    pub async fn retry(&mut self) -> Result<Stage> {
        if self.stage != Stage::Error {
            return Err(OrchestratorError::NothingToRetry);
        }
        if let Some(error) = &self.last_error {
            if !error.category.is_retryable() {
                return Err(OrchestratorError::NotRetryable(error.category));
            }
        }
        let request = self
            .last_request
            .clone()
            .ok_or(OrchestratorError::NothingToRetry)?;

        info!(mission_id = %self.id, "Retrying mission");
        self.request_plan(request).await
    }

    /// Discard the held plan and simulation without contacting the service.
    pub fn reject_plan(&mut self) -> Result<Stage> {
        if self.plan.is_none() || !matches!(self.stage, Stage::Planned | Stage::AwaitingExecute) {
            return Err(OrchestratorError::NoPlan);
        }

        self.discard_plan();
        self.transcript
            .push(TranscriptEntry::assistant("Plan discarded."));
        self.transition(Stage::Idle)?;
        Ok(self.stage)
    }

    /// Stop any poller, drop held results and errors, and return to idle.
    pub fn cancel(&mut self) -> Stage {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.discard_plan();
        self.last_error = None;

        if self.stage != Stage::Idle {
            info!(mission_id = %self.id, stage = %self.stage, "Mission cancelled");
            // Every stage may return to idle.
            if let Err(e) = self.transition(Stage::Idle) {
                warn!("{}", e);
            }
        }
        self.stage
    }

    fn discard_plan(&mut self) {
        self.plan = None;
        self.simulation = None;
    }

    fn transition(&mut self, to: Stage) -> Result<()> {
        let from = self.stage;
        StageMachine::validate_transition(from, to)?;
        self.stage = to;

        info!(
            mission_id = %self.id,
            from = %from,
            to = %to,
            "Mission stage transition"
        );
        self.publish(Event::StageChanged {
            mission_id: self.id,
            from,
            to,
        });
        Ok(())
    }

    /// Classify a failure, report it, and move into the error stage.
    fn fail(&mut self, failure: &Failure, default: Option<&str>) -> Result<()> {
        let classified = ErrorClassifier::classify_or(failure, default);
        warn!(
            mission_id = %self.id,
            stage = %self.stage,
            category = %classified.category,
            raw = %failure.message,
            "Mission failed: {}",
            classified.message
        );

        self.transcript
            .push(TranscriptEntry::assistant(classified.message.clone()));
        self.publish(Event::MissionError {
            mission_id: self.id,
            category: classified.category,
            message: classified.message.clone(),
        });
        self.discard_plan();
        self.last_error = Some(classified);
        self.transition(Stage::Error)
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl std::fmt::Debug for MissionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissionOrchestrator")
            .field("id", &self.id)
            .field("stage", &self.stage)
            .field("transcript", &self.transcript.len())
            .field("receipts", &self.receipts.len())
            .finish()
    }
}
