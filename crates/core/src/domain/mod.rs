mod plan;
mod receipt;
mod run;
pub mod scalar;
mod stage;
mod transcript;

pub use plan::{PlanResult, SimulationResult, OVER_BUDGET_RISK};
pub use receipt::{Receipt, ReceiptLinks};
pub use run::{ExecutionHandle, RunReceipts, RunState, StatusResult};
pub use stage::Stage;
pub use transcript::{Role, TranscriptEntry};
