use mission_core::ReceiptLinks;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 40;
pub const DEFAULT_MAX_RECEIPTS: usize = 5;
pub const DEFAULT_STORAGE_KEY: &str = "mission_receipts";
pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Total time the poller waits between its first and last attempt.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Bounds and location of the persisted receipt history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptConfig {
    pub max_entries: usize,
    pub storage_key: String,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_RECEIPTS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Settings for one mission orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Require a non-blocking simulation before execution.
    pub require_simulation: bool,
    /// Send prior text entries as `history` with plan requests.
    pub send_history: bool,
    pub expert: Option<bool>,
    pub poll: PollConfig,
    /// Gateway and explorer bases for links on derived receipts.
    pub links: ReceiptLinks,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            require_simulation: true,
            send_history: true,
            expert: None,
            poll: PollConfig::default(),
            links: ReceiptLinks::new(Some(DEFAULT_GATEWAY_URL.to_string()), None),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_simulation_gate(mut self, require: bool) -> Self {
        self.require_simulation = require;
        self
    }

    pub fn with_history(mut self, send: bool) -> Self {
        self.send_history = send;
        self
    }

    pub fn with_expert(mut self, expert: bool) -> Self {
        self.expert = Some(expert);
        self
    }

    pub fn with_poll(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll = PollConfig {
            interval,
            max_attempts: max_attempts.max(1),
        };
        self
    }

    pub fn with_links(mut self, links: ReceiptLinks) -> Self {
        self.links = links;
        self
    }
}
