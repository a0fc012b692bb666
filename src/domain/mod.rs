//! Domain types shared by the orchestrator, the adapters and the HTTP layer.

pub mod order;
pub mod receipt;
pub mod transaction;

pub use order::{Order, OrderStatus};
pub use receipt::PaymentReceipt;
pub use transaction::{
    to_clp_amount, InitResponse, TransactionRecord, TransactionResult, TransactionStatus,
};
