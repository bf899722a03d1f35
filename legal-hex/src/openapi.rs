//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use legal_types::domain::{AccountId, AccountKind, ConversationId, Currency, Tier, TurnId, TurnRole};
use legal_types::dto::{
    AccountResponse, ChatSendRequest, ChatSendResponse, ClientsResponse, ConversationResponse,
    CreateOrderResponse, LawyerClientResponse, LawyerProfileResponse, LawyerResponse,
    LoginRequest, LoginResponse, ProfileResponse, RegisterClientRequest, RegisterLawyerRequest,
    TurnResponse, UpdateLawyerRequest, VerifyPaymentRequest, VerifyPaymentResponse,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Register a client account
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = RegisterClientRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
async fn register_client() {}

/// Log in as a client
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login_client() {}

/// Profile and conversation history of the caller
#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized")
    )
)]
async fn profile() {}

/// Lawyers available right now, PREMIUM first
#[utoipa::path(
    get,
    path = "/users/available-lawyers",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Available lawyers", body = Vec<LawyerResponse>),
        (status = 401, description = "Unauthorized")
    )
)]
async fn available_lawyers() {}

// ─────────────────────────────────────────────────────────────────────────────
// Lawyers
// ─────────────────────────────────────────────────────────────────────────────

/// Register a lawyer account with its profile
#[utoipa::path(
    post,
    path = "/lawyers/register",
    tag = "lawyers",
    request_body = RegisterLawyerRequest,
    responses(
        (status = 201, description = "Lawyer created", body = LawyerResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
async fn register_lawyer() {}

/// Log in as a lawyer
#[utoipa::path(
    post,
    path = "/lawyers/login",
    tag = "lawyers",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Bearer token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login_lawyer() {}

/// Profile of the calling lawyer
#[utoipa::path(
    get,
    path = "/lawyers/profile",
    tag = "lawyers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a lawyer")
    )
)]
async fn lawyer_profile() {}

/// Update the calling lawyer's details; absent fields are kept
#[utoipa::path(
    put,
    path = "/lawyers/update",
    tag = "lawyers",
    request_body = UpdateLawyerRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated lawyer", body = LawyerResponse),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a lawyer")
    )
)]
async fn update_lawyer() {}

/// Clients who booked the calling lawyer
#[utoipa::path(
    get,
    path = "/lawyers/clients",
    tag = "lawyers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Clients", body = ClientsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not a lawyer")
    )
)]
async fn lawyer_clients() {}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

/// Open a checkout order for the PREMIUM subscription
#[utoipa::path(
    post,
    path = "/payments/create-order/subscription",
    tag = "payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account not found"),
        (status = 502, description = "Payment gateway failed")
    )
)]
async fn create_subscription_order() {}

/// Open a checkout order for a consultation with a lawyer
#[utoipa::path(
    post,
    path = "/payments/create-order/{target_id}",
    tag = "payments",
    security(("bearer_auth" = [])),
    params(
        ("target_id" = AccountId, Path, description = "Lawyer account ID (UUID)")
    ),
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Lawyer not found"),
        (status = 502, description = "Payment gateway failed")
    )
)]
async fn create_consultation_order() {}

/// Verify a checkout confirmation and apply it once
#[utoipa::path(
    post,
    path = "/payments/verify",
    tag = "payments",
    request_body = VerifyPaymentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Payment applied or already processed", body = VerifyPaymentResponse),
        (status = 400, description = "Missing fields, invalid signature or invalid order"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Order belongs to another account"),
        (status = 502, description = "Payment gateway failed")
    )
)]
async fn verify_payment() {}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// Send a message to the legal assistant
#[utoipa::path(
    post,
    path = "/chat/send",
    tag = "chat",
    request_body = ChatSendRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Assistant reply", body = ChatSendResponse),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Turn limit reached or userId mismatch"),
        (status = 404, description = "Conversation not found"),
        (status = 502, description = "Assistant unavailable")
    )
)]
async fn send_chat() {}

/// OpenAPI documentation for the Legal Assist API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Legal Assist API",
        version = "1.0.0",
        description = "Legal assistant chat, lawyer discovery and payments.\n\n## Authentication\n\nLog in through `/users/login` or `/lawyers/login` and send the returned token in the `Authorization` header:\n\n```\nAuthorization: Bearer <token>\n```",
        license(name = "MIT"),
    ),
    paths(
        health,
        register_client,
        login_client,
        profile,
        available_lawyers,
        register_lawyer,
        login_lawyer,
        lawyer_profile,
        update_lawyer,
        lawyer_clients,
        create_subscription_order,
        create_consultation_order,
        verify_payment,
        send_chat,
    ),
    components(
        schemas(
            RegisterClientRequest,
            RegisterLawyerRequest,
            UpdateLawyerRequest,
            LoginRequest,
            LoginResponse,
            AccountResponse,
            LawyerProfileResponse,
            LawyerResponse,
            ProfileResponse,
            ConversationResponse,
            TurnResponse,
            LawyerClientResponse,
            ClientsResponse,
            CreateOrderResponse,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            ChatSendRequest,
            ChatSendResponse,
            AccountId,
            AccountKind,
            ConversationId,
            Currency,
            Tier,
            TurnId,
            TurnRole,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Client accounts and lawyer discovery"),
        (name = "lawyers", description = "Lawyer accounts and bookings"),
        (name = "payments", description = "Checkout orders and payment verification"),
        (name = "chat", description = "Legal assistant conversations"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/health",
            "/users/register",
            "/users/login",
            "/users/profile",
            "/users/available-lawyers",
            "/lawyers/register",
            "/lawyers/login",
            "/lawyers/profile",
            "/lawyers/update",
            "/lawyers/clients",
            "/payments/create-order/subscription",
            "/payments/create-order/{target_id}",
            "/payments/verify",
            "/chat/send",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
