//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use legal_types::{
    AccountKind, AccountStore, AppError, ChatSendRequest, LoginRequest, LoginResponse,
    RegisterClientRequest, RegisterLawyerRequest, UpdateLawyerRequest, VerifyPaymentRequest,
};

use super::auth::{AuthAccount, TokenKeys};
use crate::service::{AccountService, ChatService, PaymentService};

/// Application state shared across handlers.
pub struct AppState<R: AccountStore> {
    pub accounts: AccountService<R>,
    pub payments: PaymentService<R>,
    pub chat: ChatService<R>,
    pub tokens: TokenKeys,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::MissingFields(_) | AppError::InvalidSignature | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::TurnLimitExceeded { .. } => StatusCode::FORBIDDEN,
            AppError::AccountNotFound(_)
            | AppError::ConversationNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UpstreamPayment(_) | AppError::UpstreamChat(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self.0 {
            AppError::Unauthorized(msg) | AppError::Forbidden(msg) => msg.clone(),
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            // Upstream and internal details stay in the logs
            AppError::UpstreamPayment(_) => "Payment gateway request failed".to_string(),
            AppError::UpstreamChat(_) => "Failed to get a reply from the assistant".to_string(),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });
        if let AppError::TurnLimitExceeded {
            conversation_id, ..
        } = &self.0
        {
            body["conversationId"] = serde_json::json!(conversation_id);
        }

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register_client<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<RegisterClientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.accounts.register_client(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register_lawyer<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<RegisterLawyerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lawyer = state.accounts.register_lawyer(req).await?;
    Ok((StatusCode::CREATED, Json(lawyer)))
}

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn login_client<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    login(&state, AccountKind::Client, req).await
}

#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn login_lawyer<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    login(&state, AccountKind::Lawyer, req).await
}

async fn login<R: AccountStore>(
    state: &AppState<R>,
    kind: AccountKind,
    req: LoginRequest,
) -> Result<Json<LoginResponse>, ApiError> {
    let account = state.accounts.login(kind, req).await?;
    let token = state.tokens.issue(&account)?;
    Ok(Json(LoginResponse {
        message: "Login successful".into(),
        token,
    }))
}

/// Profile of the caller, client or lawyer.
#[tracing::instrument(skip(state), fields(account_id = %caller.id))]
pub async fn profile<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.accounts.profile(caller.id).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state), fields(account_id = %caller.id))]
pub async fn lawyer_profile<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_lawyer()?;
    let profile = state.accounts.profile(caller.id).await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state))]
pub async fn available_lawyers<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let lawyers = state.accounts.available_lawyers(Utc::now()).await?;
    Ok(Json(lawyers))
}

#[tracing::instrument(skip(state, patch), fields(account_id = %caller.id))]
pub async fn update_lawyer<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
    Json(patch): Json<UpdateLawyerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_lawyer()?;
    let lawyer = state.accounts.update_lawyer(caller.id, patch).await?;
    Ok(Json(lawyer))
}

#[tracing::instrument(skip(state), fields(account_id = %caller.id))]
pub async fn lawyer_clients<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    caller.require_lawyer()?;
    let clients = state.accounts.lawyer_clients(caller.id).await?;
    Ok(Json(clients))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state), fields(payer = %caller.id))]
pub async fn create_subscription_order<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.payments.create_subscription_order(caller.id).await?;
    Ok(Json(order))
}

#[tracing::instrument(skip(state), fields(payer = %caller.id, lawyer = %target_id))]
pub async fn create_consultation_order<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
    Path(target_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .payments
        .create_consultation_order(caller.id, &target_id)
        .await?;
    Ok(Json(order))
}

#[tracing::instrument(skip(state, req), fields(payer = %caller.id))]
pub async fn verify_payment<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.payments.verify(caller.id, req).await?;
    Ok(Json(result))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(account_id = %caller.id, conversation_id = tracing::field::Empty))]
pub async fn send_chat<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    Extension(caller): Extension<AuthAccount>,
    Json(req): Json<ChatSendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.user_id.is_some_and(|id| id != caller.id) {
        return Err(AppError::Forbidden("userId does not match the token".into()).into());
    }

    let conversation_id = req.conversation()?;
    let reply = state
        .chat
        .send(caller.id, &req.message, &req.country, conversation_id)
        .await?;

    tracing::Span::current().record(
        "conversation_id",
        tracing::field::display(reply.conversation_id),
    );
    Ok(Json(reply))
}
