//! Collaborator contracts. The orchestrator only ever talks to these traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{InitResponse, Order, OrderStatus, TransactionRecord, TransactionResult, TransactionStatus};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Token '{0}' already exists")]
    DuplicateToken(String),

    #[error("Token '{0}' not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Durable token -> transaction mapping. Insert once, read many.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create_transaction(&self, record: &TransactionRecord) -> RepositoryResult<()>;

    async fn get_by_token(&self, token: &str) -> RepositoryResult<TransactionRecord>;

    /// Moves an `INIT` record to `status`. Returns `false` when the record was
    /// already terminal, so exactly one caller wins per token.
    async fn finalize(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool>;

    /// Returns a record finalized as `status` to `INIT`, so a delivery whose
    /// order update failed can be retried.
    async fn release(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool>;

    /// Every attempt started for an order, oldest first.
    async fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<TransactionRecord>>;
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway rejected the request with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),

    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),
}

/// Remote Webpay Plus API.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn init_transaction(
        &self,
        amount: i64,
        session_id: &str,
        buy_order: &str,
        return_url: &str,
        final_url: &str,
    ) -> Result<InitResponse, GatewayError>;

    async fn commit_transaction(&self, token: &str) -> Result<TransactionResult, GatewayError>;
}

#[derive(Error, Debug)]
pub enum OrderStoreError {
    #[error("Order '{0}' not found")]
    NotFound(String),

    #[error("Order store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Order store rejected the request with status {status}: {body}")]
    Status { status: u16, body: String },
}

pub type OrderResult<T> = Result<T, OrderStoreError>;

/// The host commerce system. `mark_paid` and `reduce_stock` must be
/// idempotent per order; `add_note` always appends.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: &str) -> OrderResult<Order>;

    async fn add_note(&self, order_id: &str, note: &str) -> OrderResult<()>;

    async fn mark_paid(&self, order_id: &str) -> OrderResult<()>;

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<()>;

    async fn reduce_stock(&self, order_id: &str) -> OrderResult<()>;
}
