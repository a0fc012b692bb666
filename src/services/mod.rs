pub mod orchestrator;
pub mod session_cache;

pub use orchestrator::{
    BeginOutcome, NotificationOutcome, NotificationPayload, OrchestratorConfig, ReceiptOutcome,
    TransactionOrchestrator,
};
pub use session_cache::{SessionCache, SessionEntry};
