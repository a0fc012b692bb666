use mockito::Matcher;
use serde_json::json;

use webpay_gateway::gateway::WebpayClient;
use webpay_gateway::ports::{GatewayClient, GatewayError};

const COMMERCE_CODE: &str = "597055555532";
const API_KEY: &str = "579B532A7440BB0C9079DED94D31EA1615BACEB56610332264630D42D0A36B1C";

fn client(url: String) -> WebpayClient {
    WebpayClient::new(url, COMMERCE_CODE.to_string(), API_KEY.to_string())
}

async fn init(client: &WebpayClient) -> Result<webpay_gateway::domain::InitResponse, GatewayError> {
    client
        .init_transaction(
            10000,
            "s1",
            "42",
            "https://pay.shop.test/webpay/return",
            "https://shop.test/checkout/order-received/42?key=wc_order_abc",
        )
        .await
}

#[tokio::test]
async fn test_init_sends_credentials_and_order() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/webpay/v1/transactions")
        .match_header("tbk-api-key-id", COMMERCE_CODE)
        .match_header("tbk-api-key-secret", API_KEY)
        .match_body(Matcher::PartialJson(json!({
            "amount": 10000,
            "sessionId": "s1",
            "buyOrder": "42",
            "returnUrl": "https://pay.shop.test/webpay/return",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token":"T1","url":"https://webpay3gint.transbank.cl/webpayserver/initTransaction"}"#)
        .create_async()
        .await;

    let response = init(&client(server.url())).await.unwrap();

    assert_eq!(response.token, "T1");
    assert_eq!(
        response.url,
        "https://webpay3gint.transbank.cl/webpayserver/initTransaction"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_init_without_token_is_invalid() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/webpay/v1/transactions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"url":"https://webpay3gint.transbank.cl/webpayserver/initTransaction"}"#)
        .create_async()
        .await;

    let err = init(&client(server.url())).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_init_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/webpay/v1/transactions")
        .with_status(401)
        .with_body(r#"{"error_message":"Not Authorized"}"#)
        .create_async()
        .await;

    let err = init(&client(server.url())).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_commit_returns_flattened_result() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("PUT", "/webpay/v1/transactions/T1")
        .match_header("tbk-api-key-id", COMMERCE_CODE)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "buyOrder": "42",
                "sessionId": "s1",
                "urlRedirection": "https://webpay3gint.transbank.cl/webpayserver/voucher.cgi",
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
            }"#,
        )
        .create_async()
        .await;

    let result = client(server.url()).commit_transaction("T1").await.unwrap();

    assert!(result.is_approved());
    assert_eq!(result.buy_order, "42");
    assert_eq!(result.session_id, "s1");
    assert_eq!(result.amount, 10000);
    assert_eq!(result.card_number.as_deref(), Some("6623"));
    assert_eq!(result.payment_type_code.as_deref(), Some("VN"));
}

#[tokio::test]
async fn test_commit_with_malformed_body_is_invalid() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("PUT", "/webpay/v1/transactions/T1")
        .with_status(200)
        .with_body(r#"{"sessionId":"s1"}"#)
        .create_async()
        .await;

    let err = client(server.url()).commit_transaction("T1").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_circuit_opens_after_consecutive_failures() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("PUT", Matcher::Regex(r"^/webpay/v1/transactions/.*".into()))
        .with_status(500)
        .expect_at_least(2)
        .create_async()
        .await;

    let client = WebpayClient::with_circuit_breaker(
        server.url(),
        COMMERCE_CODE.to_string(),
        API_KEY.to_string(),
        2,
        60,
    );

    assert_eq!(client.circuit_state(), "closed");
    for _ in 0..2 {
        let err = client.commit_transaction("T1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 500, .. }));
    }

    assert_eq!(client.circuit_state(), "open");
    let err = client.commit_transaction("T1").await.unwrap_err();
    assert!(matches!(err, GatewayError::CircuitBreakerOpen(_)));
}
