//! Read model of a host-commerce order.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency accepted by the gateway.
pub const SUPPORTED_CURRENCY: &str = "CLP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Accepts both `processing` and the host's prefixed `wc-processing`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_lowercase();
        let name = raw.strip_prefix("wc-").unwrap_or(&raw);
        match name {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "on-hold" => Ok(OrderStatus::OnHold),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            "failed" => Ok(OrderStatus::Failed),
            _ => Err(format!("unknown order status '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Secret shared with the buyer's browser; proves ownership on the landing page.
    pub order_key: String,
    pub total: BigDecimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_url: String,
    pub order_received_url: String,
}

impl Order {
    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    /// Where a buyer goes to try paying again.
    pub fn payment_retry_url(&self) -> &str {
        &self.payment_url
    }

    /// Landing page after a completed payment.
    pub fn post_payment_url(&self) -> &str {
        &self.order_received_url
    }

    pub fn has_supported_currency(&self) -> bool {
        self.currency.eq_ignore_ascii_case(SUPPORTED_CURRENCY)
    }
}
