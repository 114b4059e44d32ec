use mission_core::Failure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MissionClientError {
    #[error("Mission service is not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        detail: Option<String>,
        message: String,
    },

    #[error("Guardrail rejected the plan: {}", blockers.join(", "))]
    Guardrail { status: u16, blockers: Vec<String> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Event stream error: {0}")]
    EventStream(String),
}

impl MissionClientError {
    /// HTTP status the failure carried, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Guardrail { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw failure description for the error classifier.
    pub fn failure(&self) -> Failure {
        let failure = match self {
            Self::NotConfigured(_) => Failure::new(self.to_string()).with_code("NOT_CONFIGURED"),
            Self::Request(e) if e.is_timeout() => {
                Failure::new(self.to_string()).with_code("TIMEOUT")
            }
            Self::Rejected {
                code,
                detail,
                message,
                ..
            } => {
                let mut failure = Failure::new(detail.clone().unwrap_or_else(|| message.clone()));
                failure.code = code.clone();
                failure
            }
            Self::Guardrail { blockers, .. } => Failure::new(self.to_string())
                .with_code("GUARDRAIL_BLOCKED")
                .with_blockers(blockers.clone()),
            _ => Failure::new(self.to_string()),
        };

        match self.status() {
            Some(status) => failure.with_status(status),
            None => failure,
        }
    }
}

pub type Result<T> = std::result::Result<T, MissionClientError>;
