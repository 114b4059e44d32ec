//! Error classification.
//!
//! Every failure the client can observe is reduced to one short sentence a
//! user can act on. Resolution order:
//!
//! 1. the machine-readable code, looked up in [`CODE_TABLE`]
//! 2. a known HTTP status mapped to a code
//! 3. substring heuristics over the raw message
//! 4. the caller's default, the raw message, or a generic sentence

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad cause of a failure, used to decide what the user can do next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Service address or credentials missing. Never retried automatically.
    Configuration,
    /// The service refused the request (4xx).
    RequestRejected,
    /// A guardrail or policy blocked the plan; the plan must be revised.
    Guardrail,
    /// Server fault or on-chain revert; retryable by the user.
    ExecutionFault,
    /// The run reached a terminal failed state; a new mission is needed.
    RunFailure,
    /// The poll budget ran out; the run may still finish server-side.
    PollTimeout,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::RequestRejected => "request_rejected",
            Self::Guardrail => "guardrail",
            Self::ExecutionFault => "execution_fault",
            Self::RunFailure => "run_failure",
            Self::PollTimeout => "poll_timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Whether re-issuing the same request can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecutionFault | Self::Unknown)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw failure as observed by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Failure {
    pub code: Option<String>,
    pub status: Option<u16>,
    pub message: String,
    /// Guardrail blockers reported alongside the failure.
    pub blockers: Vec<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
            blockers: Vec::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_blockers(mut self, blockers: Vec<String>) -> Self {
        self.blockers = blockers;
        self
    }
}

/// A failure resolved to a user-facing sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    /// Table code the failure resolved to, if any.
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blockers: Vec<String>,
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

struct CodeEntry {
    code: &'static str,
    category: ErrorCategory,
    message: &'static str,
}

const fn entry(code: &'static str, category: ErrorCategory, message: &'static str) -> CodeEntry {
    CodeEntry {
        code,
        category,
        message,
    }
}

const CODE_TABLE: &[CodeEntry] = &[
    entry(
        "NOT_CONFIGURED",
        ErrorCategory::Configuration,
        "The mission service is not configured. Set its address and try again.",
    ),
    entry(
        "UNAUTHORIZED",
        ErrorCategory::Configuration,
        "You are not authorized to run missions. Check your access token.",
    ),
    entry(
        "FORBIDDEN",
        ErrorCategory::RequestRejected,
        "This action is not allowed for your account.",
    ),
    entry(
        "BAD_REQUEST",
        ErrorCategory::RequestRejected,
        "The request was rejected. Check the details and try again.",
    ),
    entry(
        "MISSING_FIELDS",
        ErrorCategory::RequestRejected,
        "Some required details are missing. Add them and resubmit.",
    ),
    entry(
        "RATE_LIMITED",
        ErrorCategory::RequestRejected,
        "Too many requests. Wait a moment and retry.",
    ),
    entry(
        "GUARDRAIL_BLOCKED",
        ErrorCategory::Guardrail,
        "Guardrails blocked this plan. Revise it before executing.",
    ),
    entry(
        "OVER_BUDGET",
        ErrorCategory::Guardrail,
        "The plan exceeds the available budget. Lower the reward or add funds.",
    ),
    entry(
        "SYSTEM_PAUSED",
        ErrorCategory::ExecutionFault,
        "The system is paused right now. Please try again later.",
    ),
    entry(
        "DEPENDENCY_FAILED",
        ErrorCategory::ExecutionFault,
        "An upstream step failed. Retry in a moment.",
    ),
    entry(
        "TX_REVERTED",
        ErrorCategory::ExecutionFault,
        "The transaction reverted on-chain. You can retry the mission.",
    ),
    entry(
        "SERVICE_UNAVAILABLE",
        ErrorCategory::ExecutionFault,
        "The mission service is temporarily unavailable. Retry shortly.",
    ),
    entry(
        "INTERNAL",
        ErrorCategory::ExecutionFault,
        "The mission service hit an internal error. Retry shortly.",
    ),
    entry(
        "TIMEOUT",
        ErrorCategory::ExecutionFault,
        "The request timed out. Retry in a moment.",
    ),
    entry(
        "RUN_FAILED",
        ErrorCategory::RunFailure,
        "The run failed. Start a new mission to try again.",
    ),
    entry(
        "POLL_TIMEOUT",
        ErrorCategory::PollTimeout,
        "The run is still in progress. Check back later for the receipt.",
    ),
];

const UNKNOWN_MESSAGE: &str = "Something went wrong. Please try again.";

pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(failure: &Failure) -> ClassifiedError {
        Self::classify_or(failure, None)
    }

    /// Classify with a caller-supplied sentence for failures no rule covers.
    pub fn classify_or(failure: &Failure, default: Option<&str>) -> ClassifiedError {
        let resolved = failure
            .code
            .as_deref()
            .and_then(Self::lookup)
            .or_else(|| failure.status.and_then(Self::code_for_status).and_then(Self::lookup))
            .or_else(|| Self::code_for_text(&failure.message).and_then(Self::lookup));

        if let Some(entry) = resolved {
            return ClassifiedError {
                category: entry.category,
                code: Some(entry.code.to_string()),
                message: Self::with_blocker_list(entry.message, &failure.blockers),
                blockers: failure.blockers.clone(),
            };
        }

        let message = default
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                let raw = failure.message.trim();
                (!raw.is_empty()).then(|| raw.to_string())
            })
            .unwrap_or_else(|| UNKNOWN_MESSAGE.to_string());

        ClassifiedError {
            category: Self::category_for_status(failure.status),
            code: failure.code.clone(),
            message: Self::with_blocker_list(&message, &failure.blockers),
            blockers: failure.blockers.clone(),
        }
    }

    /// User-facing sentence for a table code.
    pub fn message_for_code(code: &str) -> Option<&'static str> {
        Self::lookup(code).map(|entry| entry.message)
    }

    pub fn code_for_status(status: u16) -> Option<&'static str> {
        match status {
            400 => Some("BAD_REQUEST"),
            401 => Some("UNAUTHORIZED"),
            403 => Some("FORBIDDEN"),
            408 | 504 => Some("TIMEOUT"),
            422 => Some("GUARDRAIL_BLOCKED"),
            424 => Some("DEPENDENCY_FAILED"),
            429 => Some("RATE_LIMITED"),
            500 => Some("INTERNAL"),
            502 | 503 => Some("SERVICE_UNAVAILABLE"),
            _ => None,
        }
    }

    fn code_for_text(message: &str) -> Option<&'static str> {
        let text = message.to_lowercase();
        if text.is_empty() {
            return None;
        }

        if text.contains("paused") {
            Some("SYSTEM_PAUSED")
        } else if text.contains("guardrail") || text.contains("blocker") {
            Some("GUARDRAIL_BLOCKED")
        } else if text.contains("missing") && text.contains("field") {
            Some("MISSING_FIELDS")
        } else if text.contains("over budget") || text.contains("insufficient budget") {
            Some("OVER_BUDGET")
        } else if text.contains("revert") {
            Some("TX_REVERTED")
        } else if text.contains("timeout") || text.contains("timed out") {
            Some("TIMEOUT")
        } else if text.contains("unauthorized") {
            Some("UNAUTHORIZED")
        } else if text.contains("rate limit") || text.contains("too many requests") {
            Some("RATE_LIMITED")
        } else if text.contains("not configured") {
            Some("NOT_CONFIGURED")
        } else {
            None
        }
    }

    /// Append the blocker codes so the user sees what to revise.
    fn with_blocker_list(message: &str, blockers: &[String]) -> String {
        if blockers.is_empty() {
            message.to_string()
        } else {
            format!("{} Blocked by: {}.", message, blockers.join(", "))
        }
    }

    fn lookup(code: &str) -> Option<&'static CodeEntry> {
        let code = code.trim();
        CODE_TABLE
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(code))
    }

    fn category_for_status(status: Option<u16>) -> ErrorCategory {
        match status {
            Some(s) if (400..500).contains(&s) => ErrorCategory::RequestRejected,
            Some(s) if s >= 500 => ErrorCategory::ExecutionFault,
            _ => ErrorCategory::Unknown,
        }
    }
}
