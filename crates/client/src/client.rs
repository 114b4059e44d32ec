use async_trait::async_trait;
use mission_core::{ExecutionHandle, PlanResult, SimulationResult, StatusResult};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::api::MissionApi;
use crate::config::ClientConfig;
use crate::error::{MissionClientError, Result};
use crate::types::{ErrorBody, ExecuteRequest, PlanRequest, RunResponse, SimulateRequest};

/// Status the simulator answers with when a guardrail rejects the plan.
const GUARDRAIL_STATUS: StatusCode = StatusCode::UNPROCESSABLE_ENTITY;

pub struct MissionClient {
    config: ClientConfig,
    client: Client,
}

impl MissionClient {
    pub fn new(config: ClientConfig) -> Self {
        // Only connecting is bounded here; streamed responses may run long.
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                Client::new()
            });
        Self { config, client }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let base_url = self.config.base_url().ok_or_else(|| {
            MissionClientError::NotConfigured("mission service base URL is not set".to_string())
        })?;

        let mut builder = self
            .client
            .request(method, format!("{}/{}", base_url, path.trim_start_matches('/')));
        if let Some(token) = self.config.token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Request for a single-answer protocol call, bounded by the configured timeout.
    fn call(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.request(method, path)?.timeout(self.config.timeout))
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::rejection(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            MissionClientError::InvalidResponse(format!("Failed to decode response body: {}", e))
        })
    }

    /// Build the error for a non-success response, keeping whatever machine
    /// code and message the body carries.
    pub(crate) async fn rejection(response: reqwest::Response) -> MissionClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match ErrorBody::parse(&body) {
            Some(parsed) => MissionClientError::Rejected {
                status,
                code: parsed.code,
                message: parsed
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("status {}", status)),
                detail: parsed.message,
            },
            None => MissionClientError::Rejected {
                status,
                code: None,
                detail: None,
                message: format!("status {}", status),
            },
        }
    }
}

#[async_trait]
impl MissionApi for MissionClient {
    async fn plan(&self, request: &PlanRequest) -> Result<PlanResult> {
        let builder = self.call(Method::POST, "plan")?;
        debug!(chars = request.text.len(), "Requesting plan");

        let response = builder.json(request).send().await?;
        self.handle_response(response).await
    }

    async fn simulate(&self, plan: &PlanResult) -> Result<SimulationResult> {
        let builder = self.call(Method::POST, "simulate")?;
        debug!("Requesting simulation");

        let response = builder
            .json(&SimulateRequest { plan: &plan.plan })
            .send()
            .await?;

        if response.status() == GUARDRAIL_STATUS {
            let body = response.text().await.unwrap_or_default();
            let blockers = ErrorBody::parse(&body)
                .map(|parsed| parsed.blockers)
                .unwrap_or_default();
            warn!(blockers = ?blockers, "Simulation rejected by guardrail");
            return Err(MissionClientError::Guardrail {
                status: GUARDRAIL_STATUS.as_u16(),
                blockers,
            });
        }

        self.handle_response(response).await
    }

    async fn execute(&self, plan: &PlanResult, approvals: &[String]) -> Result<ExecutionHandle> {
        let builder = self.call(Method::POST, "execute")?;
        debug!(approvals = approvals.len(), "Requesting execution");

        let response = builder
            .json(&ExecuteRequest {
                plan: &plan.plan,
                approvals,
            })
            .send()
            .await?;

        let run: RunResponse = self.handle_response(response).await?;
        let run_id = run.run_id().ok_or_else(|| {
            MissionClientError::InvalidResponse("execute response has no run id".to_string())
        })?;

        ExecutionHandle::new(run_id).map_err(|e| MissionClientError::InvalidResponse(e.to_string()))
    }

    async fn status(&self, handle: &ExecutionHandle) -> Result<StatusResult> {
        let builder = self.call(Method::GET, "status")?;

        let response = builder
            .query(&[("run_id", handle.run_id())])
            .send()
            .await?;
        self.handle_response(response).await
    }
}
