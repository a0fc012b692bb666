//! Buyer-facing summary of a committed payment, rendered by the thank-you page.

use serde::Serialize;

use super::transaction::TransactionResult;

const NO_INSTALLMENTS: &str = "Sin cuotas";

/// Human description of a gateway payment type code.
pub fn payment_type_description(code: Option<&str>) -> &'static str {
    match code {
        Some("VD") => "Venta Débito",
        Some("VN") => "Venta Normal",
        Some("VC") => "Venta en cuotas",
        Some("SI") => "3 cuotas sin interés",
        Some("S2") => "2 cuotas sin interés",
        Some("NC") => "N cuotas sin interés",
        _ => NO_INSTALLMENTS,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub transaction_response: String,
    pub response_code: i32,
    pub buy_order: String,
    pub authorization_code: Option<String>,
    pub transaction_date: String,
    pub transaction_time: String,
    pub card_number: Option<String>,
    pub payment_type: String,
    pub payment_type_description: String,
    pub installment_type: String,
    pub amount: i64,
    pub shares_number: Option<i32>,
    pub notices: Vec<String>,
}

impl PaymentReceipt {
    pub fn from_result(result: &TransactionResult, notices: Vec<String>) -> Self {
        let code = result.payment_type_code.as_deref();
        let description = payment_type_description(code);

        let installment_type = match code {
            Some("VC") | Some("SI") | Some("S2") | Some("NC") => description,
            _ => NO_INSTALLMENTS,
        };
        let payment_type = if code == Some("VD") { "Débito" } else { "Crédito" };
        let transaction_response = if result.is_approved() {
            "Transacción Aprobada"
        } else {
            "Transacción Rechazada"
        };

        Self {
            transaction_response: transaction_response.to_string(),
            response_code: result.response_code,
            buy_order: result.buy_order.clone(),
            authorization_code: result.authorization_code.clone(),
            transaction_date: result.transaction_date.format("%d-%m-%Y").to_string(),
            transaction_time: result.transaction_date.format("%H:%M:%S").to_string(),
            card_number: result
                .card_number
                .as_ref()
                .map(|suffix| format!("************{}", suffix)),
            payment_type: payment_type.to_string(),
            payment_type_description: description.to_string(),
            installment_type: installment_type.to_string(),
            amount: result.amount,
            shares_number: result.shares_number,
            notices,
        }
    }
}
