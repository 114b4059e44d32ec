//! Direct execution of an intent, bypassing plan and simulate.
//!
//! The service either answers with a server-sent event stream of progress
//! events ending in a `final` payload, or with the final payload as plain
//! JSON. Both shapes are surfaced as a stream of [`ExecuteStreamEvent`]s.

use eventsource_stream::Eventsource;
use futures::StreamExt;
use mission_core::domain::scalar::opt_string_or_number;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::MissionClient;
use crate::error::{MissionClientError, Result};
use crate::types::IntentRequest;

const CHANNEL_CAPACITY: usize = 100;

/// Final outcome of a direct execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalPayload {
    #[serde(default, alias = "runId", deserialize_with = "opt_string_or_number")]
    pub run_id: Option<String>,
    #[serde(default, alias = "jobId", deserialize_with = "opt_string_or_number")]
    pub job_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub cid: Option<String>,
    #[serde(default, alias = "txHash", alias = "tx", deserialize_with = "opt_string_or_number")]
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecuteStreamEvent {
    Log {
        #[serde(alias = "message")]
        line: String,
    },
    Step {
        #[serde(alias = "step")]
        label: String,
    },
    Final(FinalPayload),
    Error {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl ExecuteStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final(_) | Self::Error { .. })
    }
}

pub struct ExecuteStream {
    rx: mpsc::Receiver<Result<ExecuteStreamEvent>>,
}

impl ExecuteStream {
    pub async fn next_event(&mut self) -> Option<Result<ExecuteStreamEvent>> {
        self.rx.recv().await
    }
}

impl MissionClient {
    /// Execute a free-text intent directly.
    pub async fn execute_intent(&self, intent: &str, mode: &str) -> Result<ExecuteStream> {
        let builder = self.request(Method::POST, "execute")?;

        let response = builder
            .header(ACCEPT, "text/event-stream, application/json")
            .json(&IntentRequest { intent, mode })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MissionClient::rejection(response).await);
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let (tx, rx) = mpsc::channel::<Result<ExecuteStreamEvent>>(CHANNEL_CAPACITY);

        if !is_event_stream {
            debug!("Execute answered with a single payload");
            let payload: FinalPayload = response.json().await?;
            // Receiver is held locally; the channel has capacity for this send.
            let _ = tx.send(Ok(ExecuteStreamEvent::Final(payload))).await;
            return Ok(ExecuteStream { rx });
        }

        let byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut event_stream = byte_stream.eventsource();

            while let Some(event_result) = event_stream.next().await {
                match event_result {
                    Ok(event) => {
                        if event.data.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<ExecuteStreamEvent>(&event.data) {
                            Ok(parsed) => {
                                let terminal = parsed.is_terminal();
                                if tx.send(Ok(parsed)).await.is_err() || terminal {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse execute event: {} - data: {}", e, event.data);
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(MissionClientError::EventStream(e.to_string())))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(ExecuteStream { rx })
    }
}
