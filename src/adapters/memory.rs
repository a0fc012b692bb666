//! In-process implementations of the stores, for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderStatus, TransactionRecord, TransactionStatus};
use crate::ports::{
    OrderResult, OrderStore, OrderStoreError, RepositoryError, RepositoryResult, TransactionStore,
};

#[derive(Clone, Default)]
pub struct MemoryTransactionStore {
    records: Arc<RwLock<HashMap<String, TransactionRecord>>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn create_transaction(&self, record: &TransactionRecord) -> RepositoryResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token) {
            return Err(RepositoryError::DuplicateToken(record.token.clone()));
        }
        records.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> RepositoryResult<TransactionRecord> {
        self.records
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(token.to_string()))
    }

    async fn finalize(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(token)
            .ok_or_else(|| RepositoryError::NotFound(token.to_string()))?;
        if record.status.is_terminal() {
            return Ok(false);
        }
        record.status = status;
        Ok(true)
    }

    async fn release(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(token)
            .ok_or_else(|| RepositoryError::NotFound(token.to_string()))?;
        if record.status != status {
            return Ok(false);
        }
        record.status = TransactionStatus::Init;
        Ok(true)
    }

    async fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<TransactionRecord>> {
        let mut found: Vec<TransactionRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.order_id == order_id)
            .cloned()
            .collect();
        found.sort_by_key(|record| record.created_at);
        Ok(found)
    }
}

/// Everything the host would have done to an order, for inspection.
#[derive(Debug, Clone)]
pub struct OrderState {
    pub order: Order,
    pub notes: Vec<String>,
    pub paid: bool,
    pub stock_reductions: u32,
    pub status_history: Vec<OrderStatus>,
}

/// Honours the idempotency contract: paying or reducing stock twice is a no-op.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, OrderState>>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(
            order.id.clone(),
            OrderState {
                order,
                notes: Vec::new(),
                paid: false,
                stock_reductions: 0,
                status_history: Vec::new(),
            },
        );
    }

    pub async fn state(&self, order_id: &str) -> Option<OrderState> {
        self.orders.read().await.get(order_id).cloned()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        self.orders
            .read()
            .await
            .get(order_id)
            .map(|state| state.order.clone())
            .ok_or_else(|| OrderStoreError::NotFound(order_id.to_string()))
    }

    async fn add_note(&self, order_id: &str, note: &str) -> OrderResult<()> {
        let mut orders = self.orders.write().await;
        let state = lookup(&mut orders, order_id)?;
        state.notes.push(note.to_string());
        Ok(())
    }

    async fn mark_paid(&self, order_id: &str) -> OrderResult<()> {
        let mut orders = self.orders.write().await;
        let state = lookup(&mut orders, order_id)?;
        if !state.paid {
            state.paid = true;
            state.order.status = OrderStatus::Processing;
            state.status_history.push(OrderStatus::Processing);
        }
        Ok(())
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<()> {
        let mut orders = self.orders.write().await;
        let state = lookup(&mut orders, order_id)?;
        if state.order.status != status {
            state.order.status = status;
            state.status_history.push(status);
        }
        Ok(())
    }

    async fn reduce_stock(&self, order_id: &str) -> OrderResult<()> {
        let mut orders = self.orders.write().await;
        let state = lookup(&mut orders, order_id)?;
        if state.stock_reductions == 0 {
            state.stock_reductions = 1;
        }
        Ok(())
    }
}

fn lookup<'a>(
    orders: &'a mut HashMap<String, OrderState>,
    order_id: &str,
) -> OrderResult<&'a mut OrderState> {
    orders
        .get_mut(order_id)
        .ok_or_else(|| OrderStoreError::NotFound(order_id.to_string()))
}
