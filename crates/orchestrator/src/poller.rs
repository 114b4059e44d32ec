//! Status Poller
//!
//! Tracks one execution handle to a terminal state. Each attempt calls the
//! status endpoint, replaces the live status entry of the transcript, and on
//! success derives and stores the run's receipt.

use mission_client::MissionApi;
use mission_core::{ExecutionHandle, Receipt, ReceiptLinks, RunState, StatusResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::receipt_store::ReceiptStore;
use crate::transcript::Transcript;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The run succeeded and its receipt was stored.
    Succeeded(Receipt),
    /// The run reached the terminal `failed` state.
    Failed(StatusResult),
    /// The attempt budget ran out while the run was still in flight.
    TimedOut { attempts: u32 },
    /// The token was cancelled; nothing further was written.
    Cancelled,
}

pub struct StatusPoller {
    api: Arc<dyn MissionApi>,
    handle: ExecutionHandle,
    config: PollConfig,
    token: CancellationToken,
    links: ReceiptLinks,
    plan_hash: Option<String>,
}

impl StatusPoller {
    pub fn new(
        api: Arc<dyn MissionApi>,
        handle: ExecutionHandle,
        config: PollConfig,
        token: CancellationToken,
    ) -> Self {
        Self {
            api,
            handle,
            config,
            token,
            links: ReceiptLinks::default(),
            plan_hash: None,
        }
    }

    /// Link bases and the plan hash used when deriving the receipt.
    pub fn with_receipt_links(mut self, links: ReceiptLinks, plan_hash: Option<String>) -> Self {
        self.links = links;
        self.plan_hash = plan_hash;
        self
    }

    pub fn handle(&self) -> &ExecutionHandle {
        &self.handle
    }

    pub async fn run(&self, transcript: &mut Transcript, store: &mut ReceiptStore) -> PollOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let run_id = self.handle.run_id();

        for attempt in 1..=max_attempts {
            if self.token.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let result = self.api.status(&self.handle).await;

            // A response that lands after cancellation is discarded.
            if self.token.is_cancelled() {
                debug!(run_id = %run_id, attempt, "Discarding status after cancellation");
                return PollOutcome::Cancelled;
            }

            match result {
                Ok(status) => {
                    debug!(run_id = %run_id, attempt, state = %status.state, "Polled run status");
                    let state = status.state;
                    transcript.upsert_status(status.clone());

                    match state {
                        RunState::Succeeded => {
                            let receipt = self.derive_receipt(&status);
                            if let Err(e) = store.insert(receipt.clone()).await {
                                warn!(run_id = %run_id, "Failed to persist receipt: {}", e);
                            }
                            info!(run_id = %run_id, attempt, "Run succeeded");
                            return PollOutcome::Succeeded(receipt);
                        }
                        RunState::Failed => {
                            info!(run_id = %run_id, attempt, "Run failed");
                            return PollOutcome::Failed(status);
                        }
                        RunState::Pending | RunState::Running | RunState::Unknown => {}
                    }
                }
                Err(e) => {
                    warn!(run_id = %run_id, attempt, "Status poll failed: {}", e);
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.interval) => {}
                    _ = self.token.cancelled() => return PollOutcome::Cancelled,
                }
            }
        }

        warn!(run_id = %run_id, attempts = max_attempts, "Gave up polling run");
        PollOutcome::TimedOut {
            attempts: max_attempts,
        }
    }

    fn derive_receipt(&self, status: &StatusResult) -> Receipt {
        let artifacts = status.receipts.clone().unwrap_or_default();
        Receipt::derive(
            &self.handle,
            &artifacts,
            &self.links,
            self.plan_hash.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OrchestratorConfig, ReceiptConfig};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use mission_client::{MissionClientError, PlanRequest, Result as ClientResult};
    use mission_core::{PlanResult, RunReceipts, SimulationResult};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers status calls from a script, then repeats `fallback`.
    struct ScriptedStatus {
        script: Mutex<VecDeque<ClientResult<StatusResult>>>,
        fallback: StatusResult,
        calls: AtomicUsize,
    }

    impl ScriptedStatus {
        fn new(script: Vec<ClientResult<StatusResult>>, fallback: StatusResult) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MissionApi for ScriptedStatus {
        async fn plan(&self, _request: &PlanRequest) -> ClientResult<PlanResult> {
            Err(MissionClientError::InvalidResponse("plan not scripted".to_string()))
        }

        async fn simulate(&self, _plan: &PlanResult) -> ClientResult<SimulationResult> {
            Err(MissionClientError::InvalidResponse("simulate not scripted".to_string()))
        }

        async fn execute(
            &self,
            _plan: &PlanResult,
            _approvals: &[String],
        ) -> ClientResult<ExecutionHandle> {
            Err(MissionClientError::InvalidResponse("execute not scripted".to_string()))
        }

        async fn status(&self, _handle: &ExecutionHandle) -> ClientResult<StatusResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn running() -> StatusResult {
        StatusResult::new(RunState::Running)
    }

    fn succeeded() -> StatusResult {
        StatusResult::new(RunState::Succeeded).with_receipts(RunReceipts {
            job_id: Some("7".to_string()),
            txs: vec!["0xfeed".to_string()],
            cids: vec!["bafyresult".to_string()],
            ..Default::default()
        })
    }

    async fn store() -> ReceiptStore {
        ReceiptStore::load(Arc::new(MemoryStorage::new()), &ReceiptConfig::default()).await
    }

    fn poller(api: Arc<ScriptedStatus>, token: CancellationToken) -> StatusPoller {
        StatusPoller::new(
            api,
            ExecutionHandle::new("run-42").unwrap(),
            PollConfig::default(),
            token,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_then_succeeded() {
        let api = Arc::new(ScriptedStatus::new(
            vec![Ok(running()), Ok(running()), Ok(running()), Ok(succeeded())],
            running(),
        ));
        let mut transcript = Transcript::new();
        let mut store = store().await;

        let outcome = poller(api.clone(), CancellationToken::new())
            .with_receipt_links(OrchestratorConfig::default().links, Some("0xplan".to_string()))
            .run(&mut transcript, &mut store)
            .await;

        assert_eq!(api.calls(), 4);
        assert_eq!(store.len(), 1);
        assert_eq!(transcript.status_count(), 1);

        let receipt = match outcome {
            PollOutcome::Succeeded(receipt) => receipt,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(receipt.id, "run-42");
        assert_eq!(receipt.job_id.as_deref(), Some("7"));
        assert_eq!(receipt.plan_hash.as_deref(), Some("0xplan"));
        assert_eq!(receipt.cid_urls, vec!["https://ipfs.io/ipfs/bafyresult".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_budget() {
        let api = Arc::new(ScriptedStatus::new(Vec::new(), running()));
        let mut transcript = Transcript::new();
        let mut store = store().await;

        let started = tokio::time::Instant::now();
        let outcome = poller(api.clone(), CancellationToken::new())
            .run(&mut transcript, &mut store)
            .await;

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 40 });
        assert_eq!(api.calls(), 40);
        assert!(store.is_empty());
        assert_eq!(transcript.status_count(), 1);
        assert!(started.elapsed() >= Duration::from_millis(1500) * 39);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_stops_polling() {
        let api = Arc::new(ScriptedStatus::new(
            vec![Ok(running()), Ok(StatusResult::new(RunState::Failed))],
            running(),
        ));
        let mut transcript = Transcript::new();
        let mut store = store().await;

        let outcome = poller(api.clone(), CancellationToken::new())
            .run(&mut transcript, &mut store)
            .await;

        assert!(matches!(outcome, PollOutcome::Failed(_)));
        assert_eq!(api.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_errors_consume_attempts() {
        let unavailable = || MissionClientError::Rejected {
            status: 503,
            code: None,
            detail: None,
            message: "status 503".to_string(),
        };
        // A request that never reaches the service, like a dropped connection.
        let transport = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err();
        let api = Arc::new(ScriptedStatus::new(
            vec![
                Err(MissionClientError::Request(transport)),
                Err(unavailable()),
                Ok(running()),
                Err(unavailable()),
                Ok(succeeded()),
            ],
            running(),
        ));
        let mut transcript = Transcript::new();
        let mut store = store().await;

        let started = tokio::time::Instant::now();
        let outcome = poller(api.clone(), CancellationToken::new())
            .run(&mut transcript, &mut store)
            .await;

        assert!(matches!(outcome, PollOutcome::Succeeded(_)));
        assert_eq!(api.calls(), 5);
        assert!(started.elapsed() >= PollConfig::default().interval * 4);
        assert_eq!(transcript.status_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let api = Arc::new(ScriptedStatus::new(Vec::new(), succeeded()));
        let token = CancellationToken::new();
        token.cancel();
        let mut transcript = Transcript::new();
        let mut store = store().await;

        let outcome = poller(api.clone(), token)
            .run(&mut transcript, &mut store)
            .await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(api.calls(), 0);
        assert!(transcript.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let api = Arc::new(ScriptedStatus::new(Vec::new(), running()));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2000)).await;
            canceller.cancel();
        });

        let mut transcript = Transcript::new();
        let mut store = store().await;
        let outcome = poller(api.clone(), token)
            .run(&mut transcript, &mut store)
            .await;

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(api.calls(), 2);
        assert!(store.is_empty());
    }
}
