//! Bearer token issuing and the authentication middleware.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use legal_types::{Account, AccountId, AccountKind, AccountStore, AppError};

use super::handlers::AppState;

/// JWT claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: AccountId,
    pub kind: AccountKind,
    pub iat: i64,
    pub exp: i64,
}

/// The caller, as established by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct AuthAccount {
    pub id: AccountId,
    pub kind: AccountKind,
}

impl AuthAccount {
    /// Fails with `Forbidden` unless the caller is a lawyer.
    pub fn require_lawyer(&self) -> Result<(), AppError> {
        match self.kind {
            AccountKind::Lawyer => Ok(()),
            AccountKind::Client => Err(AppError::Forbidden(
                "This endpoint is for lawyers only".into(),
            )),
        }
    }
}

/// HS256 signing material and token lifetime.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issues a token for `account`.
    pub fn issue(&self, account: &Account) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id,
            kind: account.kind,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validates signature and expiry.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected");
                AppError::Unauthorized("Invalid or expired token".into())
            })
    }
}

/// Extracts the token from `Bearer <token>`.
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    auth_header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware for the protected routes.
///
/// On success the request carries an [`AuthAccount`] extension.
pub async fn auth_middleware<R: AccountStore>(
    State(state): State<Arc<AppState<R>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(token) = extract_bearer(auth_header) else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    match state.tokens.validate(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthAccount {
                id: claims.sub,
                kind: claims.kind,
            });
            next.run(request).await
        }
        Err(_) => unauthorized_response("Invalid or expired token"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}
