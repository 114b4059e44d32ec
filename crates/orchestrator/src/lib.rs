pub mod config;
pub mod error;
pub mod mission;
pub mod poller;
pub mod receipt_store;
pub mod state_machine;
pub mod storage;
pub mod transcript;

pub use config::{OrchestratorConfig, PollConfig, ReceiptConfig};
pub use error::{OrchestratorError, Result};
pub use mission::MissionOrchestrator;
pub use poller::{PollOutcome, StatusPoller};
pub use receipt_store::ReceiptStore;
pub use state_machine::StageMachine;
pub use storage::{FileStorage, MemoryStorage, ReceiptStorage};
pub use transcript::Transcript;
pub use tokio_util::sync::CancellationToken;
