use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::domain::{InitResponse, TransactionResult};
use crate::ports::{GatewayClient, GatewayError};

const API_KEY_ID_HEADER: &str = "Tbk-Api-Key-Id";
const API_KEY_SECRET_HEADER: &str = "Tbk-Api-Key-Secret";
const TRANSACTIONS_PATH: &str = "/webpay/v1/transactions";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitRequest<'a> {
    amount: i64,
    session_id: &'a str,
    buy_order: &'a str,
    return_url: &'a str,
    final_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct InitBody {
    token: Option<String>,
    url: Option<String>,
}

/// Commit body as sent by the gateway; flattened into `TransactionResult`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitBody {
    session_id: String,
    url_redirection: String,
    transaction_date: DateTime<FixedOffset>,
    card_detail: Option<CardDetail>,
    detail_output: DetailOutput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardDetail {
    card_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailOutput {
    response_code: i32,
    amount: i64,
    buy_order: String,
    authorization_code: Option<String>,
    payment_type_code: Option<String>,
    shares_number: Option<i32>,
}

impl From<CommitBody> for TransactionResult {
    fn from(body: CommitBody) -> Self {
        TransactionResult {
            response_code: body.detail_output.response_code,
            buy_order: body.detail_output.buy_order,
            session_id: body.session_id,
            amount: body.detail_output.amount,
            authorization_code: body.detail_output.authorization_code,
            payment_type_code: body.detail_output.payment_type_code,
            shares_number: body.detail_output.shares_number,
            card_number: body.card_detail.and_then(|card| card.card_number),
            transaction_date: body.transaction_date,
            url_redirection: body.url_redirection,
        }
    }
}

/// HTTP client for the Webpay Plus transaction API
#[derive(Clone)]
pub struct WebpayClient {
    client: Client,
    base_url: String,
    commerce_code: String,
    api_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl WebpayClient {
    /// Creates a client that opens its circuit after 3 consecutive failures
    pub fn new(base_url: String, commerce_code: String, api_key: String) -> Self {
        Self::with_circuit_breaker(base_url, commerce_code, api_key, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        base_url: String,
        commerce_code: String,
        api_key: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        WebpayClient {
            client,
            base_url,
            commerce_code,
            api_key,
            circuit_breaker,
        }
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn transactions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TRANSACTIONS_PATH)
    }

    async fn guarded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match self.circuit_breaker.call(call).await {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "Webpay circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, GatewayError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[async_trait]
impl GatewayClient for WebpayClient {
    async fn init_transaction(
        &self,
        amount: i64,
        session_id: &str,
        buy_order: &str,
        return_url: &str,
        final_url: &str,
    ) -> Result<InitResponse, GatewayError> {
        let request = InitRequest {
            amount,
            session_id,
            buy_order,
            return_url,
            final_url,
        };
        let send = self
            .client
            .post(self.transactions_url())
            .header(API_KEY_ID_HEADER, self.commerce_code.as_str())
            .header(API_KEY_SECRET_HEADER, self.api_key.as_str())
            .json(&request)
            .send();

        self.guarded(async move {
            let body = read_body(send.await?).await?;
            let init: InitBody = serde_json::from_str(&body)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

            match (init.token, init.url) {
                (Some(token), Some(url)) if !token.is_empty() && !url.is_empty() => {
                    Ok(InitResponse { token, url })
                }
                _ => Err(GatewayError::InvalidResponse(
                    "init response carries no token".to_string(),
                )),
            }
        })
        .await
    }

    async fn commit_transaction(&self, token: &str) -> Result<TransactionResult, GatewayError> {
        let url = format!("{}/{}", self.transactions_url(), token);
        let send = self
            .client
            .put(url)
            .header(API_KEY_ID_HEADER, self.commerce_code.as_str())
            .header(API_KEY_SECRET_HEADER, self.api_key.as_str())
            .send();

        self.guarded(async move {
            let body = read_body(send.await?).await?;
            let commit: CommitBody = serde_json::from_str(&body)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            Ok(TransactionResult::from(commit))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webpay_client_creation() {
        let client = WebpayClient::new(
            "https://webpay3gint.transbank.cl/".to_string(),
            "597055555532".to_string(),
            "secret".to_string(),
        );
        assert_eq!(
            client.transactions_url(),
            "https://webpay3gint.transbank.cl/webpay/v1/transactions"
        );
    }

    #[test]
    fn test_circuit_breaker_state() {
        let client = WebpayClient::new(
            "https://webpay3gint.transbank.cl".to_string(),
            "597055555532".to_string(),
            "secret".to_string(),
        );
        assert_eq!(client.circuit_state(), "closed");
    }

    #[test]
    fn test_commit_body_is_flattened() {
        let body = r#"{
            "buyOrder": "42",
            "sessionId": "s1",
            "urlRedirection": "https://webpay3gint.transbank.cl/voucher",
            "transactionDate": "2020-03-20T20:18:20.000-03:00",
            "cardDetail": { "cardNumber": "6623" },
            "detailOutput": {
                "responseCode": 0,
                "amount": 10000,
                "buyOrder": "42",
                "authorizationCode": "1213",
                "paymentTypeCode": "VN",
                "sharesNumber": 0
            }
        }"#;

        let commit: CommitBody = serde_json::from_str(body).unwrap();
        let result = TransactionResult::from(commit);
        assert_eq!(result.buy_order, "42");
        assert_eq!(result.amount, 10000);
        assert_eq!(result.card_number.as_deref(), Some("6623"));
        assert!(result.is_approved());
    }

    #[test]
    fn test_commit_body_without_amount_is_rejected() {
        let body = r#"{
            "sessionId": "s1",
            "urlRedirection": "https://webpay3gint.transbank.cl/voucher",
            "transactionDate": "2020-03-20T20:18:20.000-03:00",
            "detailOutput": { "responseCode": 0, "buyOrder": "42" }
        }"#;

        assert!(serde_json::from_str::<CommitBody>(body).is_err());
    }

    #[test]
    fn test_declined_commit_body_may_omit_card_details() {
        let body = r#"{
            "sessionId": "s1",
            "urlRedirection": "https://webpay3gint.transbank.cl/voucher",
            "transactionDate": "2020-03-20T20:18:20.000-03:00",
            "detailOutput": { "responseCode": -1, "amount": 10000, "buyOrder": "42" }
        }"#;

        let result = TransactionResult::from(serde_json::from_str::<CommitBody>(body).unwrap());
        assert!(!result.is_approved());
        assert!(result.card_number.is_none());
        assert!(result.authorization_code.is_none());
    }
}
