use mission_core::domain::scalar::scalar_to_string;
use mission_core::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryMessage>>,
}

impl PlanRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_expert(mut self, expert: bool) -> Self {
        self.expert = Some(expert);
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        if !history.is_empty() {
            self.history = Some(history);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateRequest<'a> {
    pub plan: &'a Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub plan: &'a Value,
    pub approvals: &'a [String],
}

/// Direct execution request that skips the plan/simulate phases.
#[derive(Debug, Clone, Serialize)]
pub struct IntentRequest<'a> {
    pub intent: &'a str,
    pub mode: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunResponse {
    #[serde(alias = "runId", alias = "id")]
    pub run_id: Value,
}

impl RunResponse {
    pub fn run_id(&self) -> Option<String> {
        scalar_to_string(&self.run_id)
    }
}

/// Error body returned by the service on non-success responses.
///
/// The service is not consistent about where it puts the machine code and
/// message: either at the top level or nested under `detail`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub blockers: Vec<String>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        let obj = value.as_object()?;
        let detail = obj.get("detail");
        let nested = detail.and_then(Value::as_object);

        let string_at = |key: &str| -> Option<String> {
            obj.get(key)
                .and_then(Value::as_str)
                .or_else(|| nested.and_then(|n| n.get(key)).and_then(Value::as_str))
                .map(str::to_string)
        };

        let code = string_at("code").or_else(|| string_at("error_code"));
        let message = string_at("message")
            .or_else(|| obj.get("error").and_then(Value::as_str).map(str::to_string))
            .or_else(|| detail.and_then(Value::as_str).map(str::to_string));
        let blockers = obj
            .get("blockers")
            .or_else(|| nested.and_then(|n| n.get("blockers")))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default();

        Some(Self {
            code,
            message,
            blockers,
        })
    }
}
