#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::DateTime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use webpay_gateway::adapters::{MemoryOrderStore, MemoryTransactionStore};
use webpay_gateway::domain::{
    InitResponse, Order, OrderStatus, TransactionRecord, TransactionResult, TransactionStatus,
};
use webpay_gateway::ports::{
    GatewayClient, GatewayError, OrderResult, OrderStore, OrderStoreError, RepositoryResult,
    TransactionStore,
};
use webpay_gateway::services::{OrchestratorConfig, SessionCache, TransactionOrchestrator};

pub const ORDER_ID: &str = "42";
pub const ORDER_KEY: &str = "wc_order_abc";
pub const PAYMENT_URL: &str = "https://shop.test/checkout/order-pay/42";
pub const RECEIVED_URL: &str = "https://shop.test/checkout/order-received/42";
pub const VOUCHER_URL: &str = "https://webpay3gint.transbank.cl/webpayserver/voucher.cgi";
pub const GATEWAY_FORM_URL: &str = "https://webpay3gint.transbank.cl/webpayserver/initTransaction";

/// Last arguments passed to `init_transaction`.
#[derive(Debug, Clone, PartialEq)]
pub struct InitCall {
    pub amount: i64,
    pub session_id: String,
    pub buy_order: String,
    pub return_url: String,
    pub final_url: String,
}

/// Scripted gateway. `init` hands out `token`; `commit` returns `commit_result`.
pub struct StubGateway {
    pub token: Mutex<Option<String>>,
    pub commit_result: Mutex<Option<TransactionResult>>,
    pub init_calls: Mutex<Vec<InitCall>>,
    pub commit_calls: AtomicUsize,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            token: Mutex::new(Some("T1".to_string())),
            commit_result: Mutex::new(None),
            init_calls: Mutex::new(Vec::new()),
            commit_calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        let gateway = Self::new();
        *gateway.token.lock().unwrap() = None;
        gateway
    }

    pub fn with_commit(result: TransactionResult) -> Self {
        let gateway = Self::new();
        *gateway.commit_result.lock().unwrap() = Some(result);
        gateway
    }

    pub fn script_commit(&self, result: TransactionResult) {
        *self.commit_result.lock().unwrap() = Some(result);
    }

    pub fn commits(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn last_init(&self) -> Option<InitCall> {
        self.init_calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GatewayClient for StubGateway {
    async fn init_transaction(
        &self,
        amount: i64,
        session_id: &str,
        buy_order: &str,
        return_url: &str,
        final_url: &str,
    ) -> Result<InitResponse, GatewayError> {
        self.init_calls.lock().unwrap().push(InitCall {
            amount,
            session_id: session_id.to_string(),
            buy_order: buy_order.to_string(),
            return_url: return_url.to_string(),
            final_url: final_url.to_string(),
        });

        match self.token.lock().unwrap().clone() {
            Some(token) => Ok(InitResponse {
                token,
                url: GATEWAY_FORM_URL.to_string(),
            }),
            None => Err(GatewayError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }),
        }
    }

    async fn commit_transaction(&self, token: &str) -> Result<TransactionResult, GatewayError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.commit_result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| GatewayError::InvalidResponse(format!("no commit scripted for {}", token)))
    }
}

pub fn order(total: i64, currency: &str) -> Order {
    Order {
        id: ORDER_ID.to_string(),
        order_key: ORDER_KEY.to_string(),
        total: BigDecimal::from(total),
        currency: currency.to_string(),
        status: OrderStatus::Pending,
        payment_url: PAYMENT_URL.to_string(),
        order_received_url: RECEIVED_URL.to_string(),
    }
}

pub fn commit_result(response_code: i32, buy_order: &str, session_id: &str, amount: i64) -> TransactionResult {
    TransactionResult {
        response_code,
        buy_order: buy_order.to_string(),
        session_id: session_id.to_string(),
        amount,
        authorization_code: Some("1213".to_string()),
        payment_type_code: Some("VN".to_string()),
        shares_number: Some(0),
        card_number: Some("6623".to_string()),
        transaction_date: DateTime::parse_from_rfc3339("2020-03-20T20:18:20-03:00").unwrap(),
        url_redirection: VOUCHER_URL.to_string(),
    }
}

pub struct Harness {
    pub orchestrator: TransactionOrchestrator,
    pub transactions: MemoryTransactionStore,
    pub orders: MemoryOrderStore,
    pub gateway: Arc<StubGateway>,
    pub sessions: SessionCache,
}

pub async fn harness(order: Order, gateway: StubGateway) -> Harness {
    harness_with(order, gateway, OrderStatus::Processing, wrap_transactions, wrap_orders).await
}

pub fn wrap_transactions(store: MemoryTransactionStore) -> Arc<dyn TransactionStore> {
    Arc::new(store)
}

pub fn wrap_orders(store: MemoryOrderStore) -> Arc<dyn OrderStore> {
    Arc::new(store)
}

/// Same wiring as `harness`, with the post-payment status and the store
/// implementations handed to the orchestrator chosen by the caller.
pub async fn harness_with(
    order: Order,
    gateway: StubGateway,
    after_payment_status: OrderStatus,
    transactions_port: fn(MemoryTransactionStore) -> Arc<dyn TransactionStore>,
    orders_port: fn(MemoryOrderStore) -> Arc<dyn OrderStore>,
) -> Harness {
    let transactions = MemoryTransactionStore::new();
    let orders = MemoryOrderStore::new();
    orders.insert(order).await;
    let gateway = Arc::new(gateway);
    let sessions = SessionCache::default();

    let orchestrator = TransactionOrchestrator::new(
        transactions_port(transactions.clone()),
        gateway.clone(),
        orders_port(orders.clone()),
        sessions.clone(),
        OrchestratorConfig::new("https://pay.shop.test", after_payment_status),
    );

    Harness {
        orchestrator,
        transactions,
        orders,
        gateway,
        sessions,
    }
}

/// Order store whose first `mark_paid` fails as if the host were down.
pub struct FlakyOrderStore {
    inner: MemoryOrderStore,
    failed: AtomicUsize,
}

impl FlakyOrderStore {
    pub fn port(inner: MemoryOrderStore) -> Arc<dyn OrderStore> {
        Arc::new(Self {
            inner,
            failed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl OrderStore for FlakyOrderStore {
    async fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        self.inner.get_order(order_id).await
    }

    async fn add_note(&self, order_id: &str, note: &str) -> OrderResult<()> {
        self.inner.add_note(order_id, note).await
    }

    async fn mark_paid(&self, order_id: &str) -> OrderResult<()> {
        if self.failed.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(OrderStoreError::Status {
                status: 503,
                body: "down".to_string(),
            });
        }
        self.inner.mark_paid(order_id).await
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<()> {
        self.inner.update_status(order_id, status).await
    }

    async fn reduce_stock(&self, order_id: &str) -> OrderResult<()> {
        self.inner.reduce_stock(order_id).await
    }
}

/// Transaction store where another delivery always wins `finalize` with an approval.
pub struct RacingTransactionStore {
    inner: MemoryTransactionStore,
}

impl RacingTransactionStore {
    pub fn port(inner: MemoryTransactionStore) -> Arc<dyn TransactionStore> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl TransactionStore for RacingTransactionStore {
    async fn create_transaction(&self, record: &TransactionRecord) -> RepositoryResult<()> {
        self.inner.create_transaction(record).await
    }

    async fn get_by_token(&self, token: &str) -> RepositoryResult<TransactionRecord> {
        self.inner.get_by_token(token).await
    }

    async fn finalize(&self, token: &str, _status: TransactionStatus) -> RepositoryResult<bool> {
        self.inner.finalize(token, TransactionStatus::Approved).await?;
        Ok(false)
    }

    async fn release(&self, token: &str, status: TransactionStatus) -> RepositoryResult<bool> {
        self.inner.release(token, status).await
    }

    async fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<TransactionRecord>> {
        self.inner.find_by_order(order_id).await
    }
}
