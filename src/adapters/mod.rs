pub mod http_order_store;
pub mod memory;
pub mod postgres_transaction_store;

pub use http_order_store::HttpOrderStore;
pub use memory::{MemoryOrderStore, MemoryTransactionStore, OrderState};
pub use postgres_transaction_store::PostgresTransactionStore;
