//! HTTP-level tests of the router: auth, error bodies, chat, payments and
//! rate limiting, driven through `tower::ServiceExt::oneshot`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use legal_hex::inbound::{AppState, HttpServer, TokenKeys};
use legal_hex::{AccountService, AccountSettings, ChatService, PaymentService, PaymentSettings};
use legal_repo::MemoryRepo;
use legal_repo::security::sign_payment;
use legal_types::{
    Currency, GatewayError, GatewayOrder, GenerationError, GenerationRequest, OrderRequest,
    PaymentGateway, TextGenerator,
};

const KEY_SECRET: &str = "rzp_test_secret";
const JWT_SECRET: &[u8] = b"test-jwt-secret-test-jwt-secret!";

#[derive(Default)]
struct EchoGateway {
    orders: Mutex<HashMap<String, GatewayOrder>>,
}

#[async_trait]
impl PaymentGateway for EchoGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let mut orders = self.orders.lock().unwrap();
        let order = GatewayOrder {
            id: format!("order_{}", orders.len() + 1),
            amount: request.amount,
            receipt: Some(request.receipt.clone()),
            notes: Some(request.notes),
        };
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api {
                status: 400,
                message: "The id provided does not exist".into(),
            })
    }
}

struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<String>, GenerationError> {
        Ok(Some(format!(
            "Reply to turn {} under the Transfer of Property Act.",
            request.history.len()
        )))
    }
}

fn create_test_server(requests_per_minute: u32) -> HttpServer<MemoryRepo> {
    let repo = Arc::new(MemoryRepo::new());
    let state = AppState {
        accounts: AccountService::new(repo.clone(), AccountSettings { bcrypt_cost: 4 }),
        payments: PaymentService::new(
            repo.clone(),
            Arc::new(EchoGateway::default()),
            PaymentSettings {
                key_secret: KEY_SECRET.into(),
                currency: Currency::INR,
                subscription_price: 29_900,
                default_consultation_charge: 1000,
            },
        ),
        chat: ChatService::new(repo, Arc::new(CannedGenerator)),
        tokens: TokenKeys::new(JWT_SECRET, chrono::Duration::hours(1)),
    };
    HttpServer::new(state, requests_per_minute)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Registers a client and returns `(account id, token)`.
async fn sign_up(app: &Router, name: &str) -> (String, String) {
    let email = format!("{}@example.com", name.to_lowercase());
    let (status, account) = call(
        app,
        request(
            Method::POST,
            "/users/register",
            None,
            Some(json!({ "name": name, "email": email, "password": "pw-123456", "country": "India" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(account.get("passwordHash").is_none());

    let (status, login) = call(
        app,
        request(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": email, "password": "pw-123456" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        account["id"].as_str().unwrap().to_string(),
        login["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_server(10).router();

    let (status, body) = call(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = create_test_server(100).router();

    for (method, uri) in [
        (Method::GET, "/users/profile"),
        (Method::POST, "/chat/send"),
        (Method::POST, "/payments/verify"),
        (Method::POST, "/payments/create-order/subscription"),
    ] {
        let (status, body) = call(&app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["code"], 401);
    }

    let (status, _) = call(
        &app,
        request(Method::GET, "/users/profile", Some("not.a.jwt"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_chat_round_trip_and_profile() {
    let app = create_test_server(100).router();
    let (user_id, token) = sign_up(&app, "Asha").await;

    let (status, first) = call(
        &app,
        request(
            Method::POST,
            "/chat/send",
            Some(&token),
            Some(json!({ "userId": user_id, "message": "What is a lease?", "country": "India" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!first["reply"].as_str().unwrap().is_empty());
    let conversation_id = first["conversationId"].as_str().unwrap().to_string();

    let (status, second) = call(
        &app,
        request(
            Method::POST,
            "/chat/send",
            Some(&token),
            Some(json!({
                "userId": user_id,
                "message": "Can my landlord evict me?",
                "country": "India",
                "conversationId": conversation_id
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["conversationId"], conversation_id.as_str());

    let (status, profile) = call(&app, request(Method::GET, "/users/profile", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["profile"]["subscription"], "FREE");
    assert_eq!(profile["conversations"][0]["chats"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_chat_rejects_someone_elses_user_id() {
    let app = create_test_server(100).router();
    let (_, token) = sign_up(&app, "Asha").await;
    let (other_id, _) = sign_up(&app, "Ravi").await;

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/chat/send",
            Some(&token),
            Some(json!({ "userId": other_id, "message": "hello", "country": "India" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);
}

#[tokio::test]
async fn test_chat_with_malformed_conversation_id_is_json_not_found() {
    let app = create_test_server(100).router();
    let (_, token) = sign_up(&app, "Asha").await;

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/chat/send",
            Some(&token),
            Some(json!({ "message": "hello", "country": "India", "conversationId": "nope" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_verify_without_signature_is_bad_request() {
    let app = create_test_server(100).router();
    let (_, token) = sign_up(&app, "Asha").await;

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/payments/verify",
            Some(&token),
            Some(json!({ "razorpay_order_id": "order_1", "razorpay_payment_id": "pay_1" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["error"].as_str().unwrap().contains("razorpay_signature"));
}

#[tokio::test]
async fn test_subscription_checkout_upgrades_account() {
    let app = create_test_server(100).router();
    let (_, token) = sign_up(&app, "Asha").await;

    let (status, order) = call(
        &app,
        request(
            Method::POST,
            "/payments/create-order/subscription",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["amount"], 29_900);
    assert_eq!(order["currency"], "INR");
    let order_id = order["orderId"].as_str().unwrap();

    let confirmation = json!({
        "razorpay_order_id": order_id,
        "razorpay_payment_id": "pay_42",
        "razorpay_signature": sign_payment(order_id, "pay_42", KEY_SECRET)
    });

    let (status, verified) = call(
        &app,
        request(Method::POST, "/payments/verify", Some(&token), Some(confirmation.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["replayed"], false);

    let (status, replay) = call(
        &app,
        request(Method::POST, "/payments/verify", Some(&token), Some(confirmation)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["replayed"], true);

    let (_, profile) = call(&app, request(Method::GET, "/users/profile", Some(&token), None)).await;
    assert_eq!(profile["profile"]["subscription"], "PREMIUM");
}

#[tokio::test]
async fn test_consultation_order_for_unknown_lawyer_is_not_found() {
    let app = create_test_server(100).router();
    let (_, token) = sign_up(&app, "Asha").await;

    let (status, body) = call(
        &app,
        request(
            Method::POST,
            "/payments/create-order/00000000-0000-0000-0000-000000000000",
            Some(&token),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_lawyer_routes_reject_clients() {
    let app = create_test_server(100).router();
    let (_, token) = sign_up(&app, "Asha").await;

    let (status, _) = call(&app, request(Method::GET, "/lawyers/clients", Some(&token), None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rate_limiting_returns_429_when_exceeded() {
    // Sign-up runs on the anonymous bucket, so the token keeps its full quota of 3
    let app = create_test_server(3).router();
    let (_, token) = sign_up(&app, "Asha").await;

    for i in 1..=3 {
        let (status, _) = call(&app, request(Method::GET, "/users/profile", Some(&token), None)).await;
        assert_ne!(
            status,
            StatusCode::TOO_MANY_REQUESTS,
            "Request {i} should not be rate limited"
        );
    }

    let (status, body) = call(&app, request(Method::GET, "/users/profile", Some(&token), None)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].as_str().unwrap().contains("Rate limit exceeded"));
    assert_eq!(body["retry_after_seconds"], 60);
}

#[tokio::test]
async fn test_rate_limiting_health_endpoint_bypassed() {
    let app = create_test_server(1).router();

    for _ in 0..10 {
        let (status, _) = call(&app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK, "Health endpoint should not be rate limited");
    }
}
