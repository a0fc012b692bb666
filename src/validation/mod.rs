//! Cross-check of a committed gateway result against the record we stored
//! when the payment started. The notification itself is never trusted.

use std::fmt;

use crate::domain::{TransactionRecord, TransactionResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    BuyOrder { expected: String, reported: String },
    SessionId { expected: String, reported: String },
    Amount { expected: i64, reported: i64 },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::BuyOrder { expected, reported } => {
                write!(f, "buy order {} != {}", reported, expected)
            }
            Mismatch::SessionId { expected, reported } => {
                write!(f, "session id {} != {}", reported, expected)
            }
            Mismatch::Amount { expected, reported } => {
                write!(f, "amount {} != {}", reported, expected)
            }
        }
    }
}

/// Every field of `result` that disagrees with `record`.
pub fn mismatches(result: &TransactionResult, record: &TransactionRecord) -> Vec<Mismatch> {
    let mut found = Vec::new();

    if result.buy_order != record.order_id {
        found.push(Mismatch::BuyOrder {
            expected: record.order_id.clone(),
            reported: result.buy_order.clone(),
        });
    }
    if result.session_id != record.session_id {
        found.push(Mismatch::SessionId {
            expected: record.session_id.clone(),
            reported: result.session_id.clone(),
        });
    }
    if result.amount != record.amount {
        found.push(Mismatch::Amount {
            expected: record.amount,
            reported: result.amount,
        });
    }

    found
}

/// Identity check only; the response code is judged by `TransactionResult::is_approved`.
pub fn is_valid(result: &TransactionResult, record: &TransactionRecord) -> bool {
    mismatches(result, record).is_empty()
}
