//! Payment attempt entities.
//! `TransactionRecord` is what we persist; `TransactionResult` is what the
//! gateway reports back on commit and is only ever compared, never stored.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle of a payment attempt. Only `Init` may transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Init,
    Approved,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Init => "INIT",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Init)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INIT" => Ok(TransactionStatus::Init),
            "APPROVED" => Ok(TransactionStatus::Approved),
            "REJECTED" => Ok(TransactionStatus::Rejected),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// One row per payment attempt, keyed by the gateway token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub order_id: String,
    pub amount: i64,
    pub token: String,
    pub session_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(order_id: String, amount: i64, token: String, session_id: String) -> Self {
        Self {
            order_id,
            amount,
            token,
            session_id,
            status: TransactionStatus::Init,
            created_at: Utc::now(),
        }
    }
}

/// Response of `initTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitResponse {
    pub token: String,
    pub url: String,
}

/// Authoritative outcome returned by `commitTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub response_code: i32,
    pub buy_order: String,
    pub session_id: String,
    pub amount: i64,
    pub authorization_code: Option<String>,
    pub payment_type_code: Option<String>,
    pub shares_number: Option<i32>,
    /// Last digits only.
    pub card_number: Option<String>,
    pub transaction_date: DateTime<FixedOffset>,
    pub url_redirection: String,
}

impl TransactionResult {
    pub fn is_approved(&self) -> bool {
        self.response_code == 0
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmountError {
    #[error("order total must be greater than zero, got {0}")]
    NonPositive(String),

    #[error("order total {0} does not fit in an integer amount")]
    OutOfRange(String),
}

/// Converts an order total to a zero-decimal amount, rounding half away from zero.
pub fn to_clp_amount(total: &BigDecimal) -> Result<i64, AmountError> {
    let zero = BigDecimal::from(0);
    if total <= &zero {
        return Err(AmountError::NonPositive(total.to_string()));
    }

    let truncated = total.with_scale(0);
    let remainder = total - &truncated;
    let rounded = if &remainder * BigDecimal::from(2) >= BigDecimal::from(1) {
        truncated + BigDecimal::from(1)
    } else {
        truncated
    };

    let amount = rounded
        .to_i64()
        .ok_or_else(|| AmountError::OutOfRange(total.to_string()))?;
    if amount <= 0 {
        return Err(AmountError::NonPositive(total.to_string()));
    }
    Ok(amount)
}
