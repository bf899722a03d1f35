//! # Legal Assist Client SDK
//!
//! A typed Rust client for the Legal Assist API.

use legal_types::{
    AccountId, AccountResponse, ChatSendRequest, ChatSendResponse, ClientsResponse,
    ConversationId, CreateOrderResponse, LawyerResponse, LoginRequest, LoginResponse,
    ProfileResponse, RegisterClientRequest, RegisterLawyerRequest, UpdateLawyerRequest,
    VerifyPaymentRequest, VerifyPaymentResponse,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Legal Assist API client.
pub struct LegalClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl LegalClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer token for authenticated routes.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ── Accounts ────────────────────────────────────────────────────────────

    pub async fn register_client(
        &self,
        req: &RegisterClientRequest,
    ) -> Result<AccountResponse, ClientError> {
        self.post("/users/register", req).await
    }

    pub async fn register_lawyer(
        &self,
        req: &RegisterLawyerRequest,
    ) -> Result<LawyerResponse, ClientError> {
        self.post("/lawyers/register", req).await
    }

    /// Logs in; `lawyer` selects the lawyer login route.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        lawyer: bool,
    ) -> Result<LoginResponse, ClientError> {
        let path = if lawyer { "/lawyers/login" } else { "/users/login" };
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post(path, &req).await
    }

    pub async fn profile(&self) -> Result<ProfileResponse, ClientError> {
        self.get("/users/profile").await
    }

    pub async fn lawyer_profile(&self) -> Result<ProfileResponse, ClientError> {
        self.get("/lawyers/profile").await
    }

    pub async fn available_lawyers(&self) -> Result<Vec<LawyerResponse>, ClientError> {
        self.get("/users/available-lawyers").await
    }

    pub async fn update_lawyer(
        &self,
        patch: &UpdateLawyerRequest,
    ) -> Result<LawyerResponse, ClientError> {
        self.send(self.http.put(self.url("/lawyers/update")).json(patch))
            .await
    }

    pub async fn lawyer_clients(&self) -> Result<ClientsResponse, ClientError> {
        self.get("/lawyers/clients").await
    }

    // ── Payments ────────────────────────────────────────────────────────────

    pub async fn create_subscription_order(&self) -> Result<CreateOrderResponse, ClientError> {
        self.post("/payments/create-order/subscription", &serde_json::json!({}))
            .await
    }

    pub async fn create_consultation_order(
        &self,
        lawyer_id: AccountId,
    ) -> Result<CreateOrderResponse, ClientError> {
        self.post(
            &format!("/payments/create-order/{lawyer_id}"),
            &serde_json::json!({}),
        )
        .await
    }

    /// Submits a checkout confirmation as returned by the gateway widget.
    pub async fn verify_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<VerifyPaymentResponse, ClientError> {
        let req = VerifyPaymentRequest {
            razorpay_order_id: Some(order_id.to_string()),
            razorpay_payment_id: Some(payment_id.to_string()),
            razorpay_signature: Some(signature.to_string()),
        };
        self.post("/payments/verify", &req).await
    }

    // ── Chat ────────────────────────────────────────────────────────────────

    /// Sends a message; `None` starts a new conversation.
    pub async fn send_chat(
        &self,
        message: &str,
        country: &str,
        conversation_id: Option<ConversationId>,
    ) -> Result<ChatSendResponse, ClientError> {
        let req = ChatSendRequest {
            user_id: None,
            message: message.to_string(),
            country: country.to_string(),
            conversation_id: conversation_id.map(|id| id.to_string()),
        };
        self.post("/chat/send", &req).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http.get(self.url(path))).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, mut req: RequestBuilder) -> Result<T, ClientError> {
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
