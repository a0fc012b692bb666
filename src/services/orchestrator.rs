use std::sync::Arc;

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::{
    to_clp_amount, Order, OrderStatus, PaymentReceipt, TransactionRecord, TransactionResult,
    TransactionStatus,
};
use crate::error::{AppError, UNEXPECTED_END_MESSAGE};
use crate::ports::{GatewayClient, OrderStore, TransactionStore};
use crate::redirect::RedirectForm;
use crate::services::session_cache::SessionCache;
use crate::utils::sanitize::mask_secret;
use crate::validation::{self, Mismatch};

/// Fixed callback endpoint the gateway posts `token_ws` to.
pub const RETURN_PATH: &str = "/webpay/return";
pub const TOKEN_FIELD: &str = "token_ws";

pub const PAID_NOTE: &str = "Pago exitoso con Webpay Plus";
pub const REJECTED_NOTE: &str = "Pago rechazado";
pub const CANCELLED_NOTE: &str = "Pago cancelado con Webpay Plus";
pub const GATEWAY_UNAVAILABLE_NOTICE: &str =
    "Ocurrió un error al intentar conectar con WebPay Plus. Por favor intenta mas tarde.";

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Absolute URL of `RETURN_PATH` on this service.
    pub return_url: String,
    pub after_payment_status: OrderStatus,
}

impl OrchestratorConfig {
    pub fn new(public_base_url: &str, after_payment_status: OrderStatus) -> Self {
        Self {
            return_url: format!("{}{}", public_base_url.trim_end_matches('/'), RETURN_PATH),
            after_payment_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Pending record stored; send the buyer to the gateway.
    Redirect { url: String, token: String },
    /// Nothing stored; the buyer may retry.
    GatewayUnavailable { notice: String },
}

/// Inbound gateway post. Only the token is read from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPayload {
    pub token_ws: Option<String>,
}

impl NotificationPayload {
    pub fn from_form(body: &[u8]) -> Self {
        let token_ws = url::form_urlencoded::parse(body)
            .find(|(name, _)| name == TOKEN_FIELD)
            .map(|(_, value)| value.into_owned());
        Self { token_ws }
    }

    pub fn token(&self) -> Option<&str> {
        self.token_ws
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub order_id: String,
    pub token: String,
    pub status: TransactionStatus,
    pub redirect_url: String,
    /// Set when this delivery found the transaction already finalized.
    pub replayed: bool,
}

impl NotificationOutcome {
    pub fn redirect(&self) -> RedirectForm {
        RedirectForm::new(self.redirect_url.as_str()).param(TOKEN_FIELD, self.token.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptOutcome {
    Receipt(PaymentReceipt),
    /// The buyer came back without paying; the order was failed.
    Cancelled { retry_url: String, notices: Vec<String> },
    Empty { notices: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Approved,
    Declined { response_code: i32 },
    Mismatched(Vec<Mismatch>),
}

fn evaluate(result: &TransactionResult, record: &TransactionRecord) -> Verdict {
    let found = validation::mismatches(result, record);
    if !found.is_empty() {
        Verdict::Mismatched(found)
    } else if !result.is_approved() {
        Verdict::Declined {
            response_code: result.response_code,
        }
    } else {
        Verdict::Approved
    }
}

/// Drives a payment attempt from checkout to a terminal order status.
pub struct TransactionOrchestrator {
    transactions: Arc<dyn TransactionStore>,
    gateway: Arc<dyn GatewayClient>,
    orders: Arc<dyn OrderStore>,
    sessions: SessionCache,
    config: OrchestratorConfig,
}

impl TransactionOrchestrator {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        gateway: Arc<dyn GatewayClient>,
        orders: Arc<dyn OrderStore>,
        sessions: SessionCache,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            transactions,
            gateway,
            orders,
            sessions,
            config,
        }
    }

    pub async fn begin_transaction(&self, order_id: &str) -> Result<BeginOutcome, AppError> {
        let order = self.orders.get_order(order_id).await?;
        if !order.has_supported_currency() {
            return Err(AppError::UnsupportedCurrency(order.currency));
        }

        let amount = to_clp_amount(order.total()).map_err(|e| AppError::Validation(e.to_string()))?;
        let session_id = Uuid::new_v4().simple().to_string();
        let final_url = final_url(&order)?;

        let init = self
            .gateway
            .init_transaction(amount, &session_id, &order.id, &self.config.return_url, &final_url)
            .await;

        let response = match init {
            Ok(response) if !response.token.trim().is_empty() => response,
            Ok(_) => {
                warn!(order_id = %order.id, "Gateway returned no token");
                return Ok(self.gateway_unavailable(&order).await);
            }
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Could not start Webpay transaction");
                return Ok(self.gateway_unavailable(&order).await);
            }
        };

        let record = TransactionRecord::new(order.id.clone(), amount, response.token.clone(), session_id);
        self.transactions.create_transaction(&record).await?;

        info!(
            order_id = %order.id,
            amount,
            token = %mask_secret(&response.token),
            "Webpay transaction started"
        );

        Ok(BeginOutcome::Redirect {
            url: response.url,
            token: response.token,
        })
    }

    pub async fn handle_notification(
        &self,
        payload: &NotificationPayload,
    ) -> Result<NotificationOutcome, AppError> {
        let token = payload.token().ok_or(AppError::MissingToken)?.to_string();
        let record = self.transactions.get_by_token(&token).await?;

        if record.status.is_terminal() {
            return self.replay(&record).await;
        }

        let result = self.gateway.commit_transaction(&token).await?;
        // Identity always comes from the stored record, never the notification.
        let order = self.orders.get_order(&record.order_id).await?;

        let verdict = evaluate(&result, &record);
        let approved = verdict == Verdict::Approved;
        let status = if approved {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Rejected
        };
        if !self.transactions.finalize(&token, status).await? {
            info!(
                order_id = %order.id,
                token = %mask_secret(&token),
                "Concurrent notification already finalized this transaction"
            );
            let current = self.transactions.get_by_token(&token).await?;
            return self.replay(&current).await;
        }

        let settled = match &verdict {
            Verdict::Approved => self
                .complete_order(&order, &result)
                .await
                .map(|_| result.url_redirection.clone()),
            Verdict::Declined { .. } | Verdict::Mismatched(_) => self
                .fail_order(&order, &result)
                .await
                .map(|_| order.payment_retry_url().to_string()),
        };
        let redirect_url = match settled {
            Ok(url) => url,
            Err(e) => {
                self.release(&token, status).await;
                return Err(e);
            }
        };

        self.sessions
            .store_result(&order.order_key, result.clone(), approved)
            .await;

        match verdict {
            Verdict::Approved => info!(
                order_id = %order.id,
                token = %mask_secret(&token),
                response_code = result.response_code,
                "Webpay payment approved"
            ),
            Verdict::Declined { response_code } => {
                warn!(order_id = %order.id, response_code, "Webpay payment declined")
            }
            Verdict::Mismatched(found) => {
                let details: Vec<String> = found.iter().map(ToString::to_string).collect();
                warn!(
                    order_id = %order.id,
                    token = %mask_secret(&token),
                    mismatches = %details.join(", "),
                    "Webpay result does not match the stored transaction"
                );
            }
        }

        Ok(NotificationOutcome {
            order_id: order.id,
            token,
            status,
            redirect_url,
            replayed: false,
        })
    }

    /// Thank-you page data. Consumes the cached session entry.
    pub async fn receipt(&self, order_id: &str, order_key: &str) -> Result<ReceiptOutcome, AppError> {
        let order = self.orders.get_order(order_id).await?;
        if order.order_key != order_key {
            return Err(AppError::Forbidden(format!("order key does not match order {}", order.id)));
        }

        let entry = self.sessions.take(&order.order_key).await.unwrap_or_default();
        if let Some(result) = entry.result {
            return Ok(ReceiptOutcome::Receipt(PaymentReceipt::from_result(
                &result,
                entry.notices,
            )));
        }

        // Only an order with an open Webpay attempt and no approval was abandoned.
        let attempts = self.transactions.find_by_order(&order.id).await?;
        let approved = attempts
            .iter()
            .any(|record| record.status == TransactionStatus::Approved);
        let abandoned = !attempts.is_empty()
            && !approved
            && !entry.paid
            && order.status == OrderStatus::Pending;

        if !abandoned {
            return Ok(ReceiptOutcome::Empty {
                notices: entry.notices,
            });
        }

        self.orders.add_note(&order.id, CANCELLED_NOTE).await?;
        self.orders.update_status(&order.id, OrderStatus::Failed).await?;
        info!(order_id = %order.id, "Webpay payment cancelled by buyer");
        Ok(ReceiptOutcome::Cancelled {
            retry_url: order.payment_retry_url().to_string(),
            notices: entry.notices,
        })
    }

    async fn gateway_unavailable(&self, order: &Order) -> BeginOutcome {
        self.sessions
            .push_notice(&order.order_key, GATEWAY_UNAVAILABLE_NOTICE)
            .await;
        BeginOutcome::GatewayUnavailable {
            notice: GATEWAY_UNAVAILABLE_NOTICE.to_string(),
        }
    }

    /// Undoes `finalize` after the order update failed. The original error wins.
    async fn release(&self, token: &str, status: TransactionStatus) {
        match self.transactions.release(token, status).await {
            Ok(_) => warn!(
                token = %mask_secret(token),
                "Order update failed; transaction reopened for retry"
            ),
            Err(e) => warn!(
                token = %mask_secret(token),
                error = %e,
                "Could not reopen transaction after failed order update"
            ),
        }
    }

    async fn replay(&self, record: &TransactionRecord) -> Result<NotificationOutcome, AppError> {
        let order = self.orders.get_order(&record.order_id).await?;
        let redirect_url = match record.status {
            TransactionStatus::Approved => order.post_payment_url(),
            _ => order.payment_retry_url(),
        };

        warn!(
            order_id = %order.id,
            token = %mask_secret(&record.token),
            status = %record.status,
            "Duplicate Webpay notification ignored"
        );

        Ok(NotificationOutcome {
            order_id: order.id.clone(),
            token: record.token.clone(),
            status: record.status,
            redirect_url: redirect_url.to_string(),
            replayed: true,
        })
    }

    async fn complete_order(&self, order: &Order, result: &TransactionResult) -> Result<(), AppError> {
        self.orders.add_note(&order.id, PAID_NOTE).await?;
        self.orders.add_note(&order.id, &result_note(result)?).await?;
        self.orders.mark_paid(&order.id).await?;
        self.orders
            .update_status(&order.id, self.config.after_payment_status)
            .await?;
        self.orders.reduce_stock(&order.id).await?;
        Ok(())
    }

    async fn fail_order(&self, order: &Order, result: &TransactionResult) -> Result<(), AppError> {
        self.orders.add_note(&order.id, REJECTED_NOTE).await?;
        self.orders.add_note(&order.id, &result_note(result)?).await?;
        self.orders.update_status(&order.id, OrderStatus::Failed).await?;
        self.sessions
            .push_notice(&order.order_key, UNEXPECTED_END_MESSAGE)
            .await;
        Ok(())
    }
}

fn result_note(result: &TransactionResult) -> Result<String, AppError> {
    serde_json::to_string(result).map_err(|e| AppError::Internal(e.to_string()))
}

/// The order's landing page with `key=<order_key>` so the buyer can prove ownership.
fn final_url(order: &Order) -> Result<String, AppError> {
    let mut url = Url::parse(order.post_payment_url())
        .map_err(|e| AppError::Validation(format!("invalid order received url: {}", e)))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| *name != "key")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("key", &order.order_key);

    Ok(url.to_string())
}
