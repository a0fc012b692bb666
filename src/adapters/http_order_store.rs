//! OrderStore backed by the host commerce system's JSON API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::json;
use std::time::Duration;

use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderResult, OrderStore, OrderStoreError};

#[derive(Clone)]
pub struct HttpOrderStore {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpOrderStore {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url,
            api_token,
        }
    }

    fn order_url(&self, order_id: &str, action: &str) -> String {
        format!(
            "{}/orders/{}{}",
            self.base_url.trim_end_matches('/'),
            order_id,
            action
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, order_id: &str, request: RequestBuilder) -> OrderResult<reqwest::Response> {
        let response = self.authorized(request).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(OrderStoreError::NotFound(order_id.to_string())),
            status if status.is_success() => Ok(response),
            status => Err(OrderStoreError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl OrderStore for HttpOrderStore {
    async fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        let request = self.client.get(self.order_url(order_id, ""));
        let order = self.send(order_id, request).await?.json::<Order>().await?;
        Ok(order)
    }

    async fn add_note(&self, order_id: &str, note: &str) -> OrderResult<()> {
        let request = self
            .client
            .post(self.order_url(order_id, "/notes"))
            .json(&json!({ "note": note }));
        self.send(order_id, request).await?;
        Ok(())
    }

    async fn mark_paid(&self, order_id: &str) -> OrderResult<()> {
        let request = self.client.post(self.order_url(order_id, "/payment-complete"));
        self.send(order_id, request).await?;
        Ok(())
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> OrderResult<()> {
        let request = self
            .client
            .put(self.order_url(order_id, "/status"))
            .json(&json!({ "status": status }));
        self.send(order_id, request).await?;
        Ok(())
    }

    async fn reduce_stock(&self, order_id: &str) -> OrderResult<()> {
        let request = self.client.post(self.order_url(order_id, "/stock-reductions"));
        self.send(order_id, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_urls() {
        let store = HttpOrderStore::new("https://shop.test/api/".to_string(), None);
        assert_eq!(store.order_url("42", ""), "https://shop.test/api/orders/42");
        assert_eq!(
            store.order_url("42", "/notes"),
            "https://shop.test/api/orders/42/notes"
        );
    }
}
