//! Razorpay Orders API adapter for the `PaymentGateway` port.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use legal_types::{
    Currency, GatewayError, GatewayOrder, Money, OrderNotes, OrderRequest, PaymentGateway,
};

use super::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: Currency,
    receipt: &'a str,
    notes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
    /// An object of string pairs, or `[]` when the order has no notes
    #[serde(default)]
    notes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    description: String,
}

impl OrderBody {
    fn into_order(self) -> Result<GatewayOrder, GatewayError> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|e| GatewayError::Decode(format!("{e}")))?;
        let amount =
            Money::new(self.amount, currency).map_err(|e| GatewayError::Decode(e.to_string()))?;

        let notes = serde_json::from_value::<BTreeMap<String, String>>(self.notes)
            .ok()
            .and_then(|map| OrderNotes::from_map(&map));

        Ok(GatewayOrder {
            id: self.id,
            amount,
            receipt: self.receipt,
            notes,
        })
    }
}

/// HTTP client for the Razorpay Orders API.
pub struct RazorpayGateway {
    client: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
    retry: RetryPolicy,
}

impl RazorpayGateway {
    pub fn new(
        key_id: String,
        key_secret: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            key_id,
            key_secret,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry,
        })
    }

    /// Override the API base URL (for testing).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<GatewayOrder, GatewayError> {
        let response = request
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        debug!(status = %status, "gateway response received");

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.description)
                .unwrap_or(text);
            error!(status = %status, message = %message, "gateway request failed");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<OrderBody>(&text)
            .map_err(|e| GatewayError::Decode(e.to_string()))?
            .into_order()
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, request), fields(receipt = %request.receipt, amount = request.amount.amount()))]
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let body = CreateOrderBody {
            amount: request.amount.amount(),
            currency: request.amount.currency(),
            receipt: &request.receipt,
            notes: request.notes.into_map(),
        };

        self.retry
            .run("razorpay.create_order", GatewayError::is_transient, || {
                self.send(self.client.post(&url).json(&body))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders/{}", self.base_url, order_id);

        self.retry
            .run("razorpay.fetch_order", GatewayError::is_transient, || {
                self.send(self.client.get(&url))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_types::{AccountId, PaymentKind};
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(base_url: &str) -> RazorpayGateway {
        RazorpayGateway::new(
            "rzp_test_key".into(),
            "rzp_test_secret".into(),
            Duration::from_secs(5),
            RetryPolicy {
                max_retries: 1,
                initial_backoff: Duration::from_millis(1),
            },
        )
        .unwrap()
        .with_base_url(base_url.to_string())
    }

    fn order_json(notes: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "order_test",
            "entity": "order",
            "amount": 29900,
            "currency": "INR",
            "receipt": "rcpt_1",
            "status": "created",
            "notes": notes
        })
    }

    #[tokio::test]
    async fn test_create_order_sends_notes_and_auth() {
        let server = MockServer::start().await;
        let payer = AccountId::new();
        let notes = OrderNotes {
            payer,
            kind: PaymentKind::Subscription,
        };

        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(basic_auth("rzp_test_key", "rzp_test_secret"))
            .and(body_partial_json(serde_json::json!({
                "amount": 29900,
                "currency": "INR",
                "notes": { "payer_id": payer.to_string(), "purpose": "subscription" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(order_json(serde_json::json!(notes.into_map()))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let order = gateway(&server.uri())
            .create_order(&OrderRequest {
                amount: Money::new(29900, Currency::INR).unwrap(),
                receipt: "rcpt_1".into(),
                notes,
            })
            .await
            .unwrap();

        assert_eq!(order.id, "order_test");
        assert_eq!(order.amount.amount(), 29900);
        assert_eq!(order.notes, Some(notes));
    }

    #[tokio::test]
    async fn test_order_without_notes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orders/order_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(serde_json::json!([]))))
            .mount(&server)
            .await;

        let order = gateway(&server.uri())
            .fetch_order("order_test")
            .await
            .unwrap();

        assert_eq!(order.notes, None);
    }

    #[tokio::test]
    async fn test_fetch_order_retries_on_503() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orders/order_test"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/orders/order_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json(serde_json::json!({}))))
            .mount(&server)
            .await;

        let order = gateway(&server.uri())
            .fetch_order("order_test")
            .await
            .unwrap();

        assert_eq!(order.id, "order_test");
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/orders/order_missing"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": "BAD_REQUEST_ERROR",
                    "description": "The id provided does not exist"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = gateway(&server.uri()).fetch_order("order_missing").await;

        match result {
            Err(GatewayError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "The id provided does not exist");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
