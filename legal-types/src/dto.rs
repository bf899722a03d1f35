//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Request bodies default missing fields so handlers can report them as
//! `MissingFields` instead of failing JSON extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Account, AccountId, AccountKind, Conversation, ConversationId, Currency, LawyerClient,
    LawyerProfile, Tier, Turn, TurnId, TurnRole,
};
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a client account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterClientRequest {
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "asha@example.com")]
    pub email: String,
    pub password: String,
    #[schema(example = "India")]
    pub country: String,
}

/// Request to register a lawyer account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterLawyerRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Property law")]
    pub specialization: Option<String>,
    /// Consultation charge in major currency units
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1500)]
    pub charge: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_to: Option<DateTime<Utc>>,
}

/// Partial update of a lawyer's account and profile. Absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateLawyerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Email/password credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Login successful")]
    pub message: String,
    pub token: String,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub country: String,
    pub kind: AccountKind,
    pub subscription: Tier,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            country: account.country.clone(),
            kind: account.kind,
            subscription: account.tier,
            created_at: account.created_at,
        }
    }
}

/// Professional details of a lawyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LawyerProfileResponse {
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub charge: Option<i64>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
}

impl From<&LawyerProfile> for LawyerProfileResponse {
    fn from(profile: &LawyerProfile) -> Self {
        Self {
            phone: profile.phone.clone(),
            specialization: profile.specialization.clone(),
            charge: profile.charge,
            available_from: profile.available_from,
            available_to: profile.available_to,
        }
    }
}

/// A lawyer as shown in discovery and registration responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LawyerResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    #[serde(flatten)]
    pub profile: LawyerProfileResponse,
}

impl LawyerResponse {
    pub fn new(account: &Account, profile: &LawyerProfile) -> Self {
        Self {
            account: account.into(),
            profile: profile.into(),
        }
    }
}

/// One turn in profile history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub id: TurnId,
    pub role: TurnRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Turn> for TurnResponse {
    fn from(turn: &Turn) -> Self {
        Self {
            id: turn.id,
            role: turn.role,
            message: turn.message.clone(),
            created_at: turn.created_at,
        }
    }
}

/// A conversation with its turns.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub chats: Vec<TurnResponse>,
}

impl ConversationResponse {
    pub fn new(conversation: &Conversation, turns: &[Turn]) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title.clone(),
            created_at: conversation.created_at,
            chats: turns.iter().map(TurnResponse::from).collect(),
        }
    }
}

/// Profile of the authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub profile: AccountResponse,
    /// Present for lawyer accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lawyer: Option<LawyerProfileResponse>,
    pub conversations: Vec<ConversationResponse>,
}

/// A client who booked the authenticated lawyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LawyerClientResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub country: String,
    /// Minor currency units
    pub amount_paid: i64,
    pub currency: Currency,
    pub payment_date: DateTime<Utc>,
}

impl From<&LawyerClient> for LawyerClientResponse {
    fn from(client: &LawyerClient) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            email: client.email.clone(),
            country: client.country.clone(),
            amount_paid: client.amount_paid.amount(),
            currency: client.amount_paid.currency(),
            payment_date: client.payment_date,
        }
    }
}

/// List of clients of a lawyer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientsResponse {
    pub success: bool,
    pub clients: Vec<LawyerClientResponse>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Checkout order opened with the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    #[schema(example = "order_Nf3kq8Zx1")]
    pub order_id: String,
    /// Amount in minor currency units
    #[schema(example = 100000)]
    pub amount: i64,
    pub currency: Currency,
}

/// Payment confirmation callback forwarded by the client after checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

/// Result of a payment verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub payment_id: String,
    /// True when this payment had already been processed
    pub replayed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A user message for the legal assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatSendRequest {
    /// Must match the authenticated account when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<AccountId>,
    #[schema(example = "What is a lease?")]
    pub message: String,
    /// Country to localize the answer for; defaults to the account's country
    #[schema(example = "India")]
    pub country: String,
    /// Omit to start a new conversation. Ids that do not parse name no
    /// conversation and are answered with 404.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(format = Uuid)]
    pub conversation_id: Option<String>,
}

impl ChatSendRequest {
    /// The conversation to continue, `Ok(None)` for a new one.
    pub fn conversation(&self) -> Result<Option<ConversationId>, AppError> {
        self.conversation_id
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| AppError::NotFound(format!("Conversation not found: {raw}")))
            })
            .transpose()
    }
}

/// The assistant's reply.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendResponse {
    pub reply: String,
    pub conversation_id: ConversationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(conversation_id: Option<&str>) -> ChatSendRequest {
        ChatSendRequest {
            message: "What is a lease?".into(),
            conversation_id: conversation_id.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_conversation_id_parsing() {
        let id = ConversationId::new();

        assert_eq!(chat(None).conversation().unwrap(), None);
        assert_eq!(
            chat(Some(&id.to_string())).conversation().unwrap(),
            Some(id)
        );
        assert!(matches!(
            chat(Some("nope")).conversation(),
            Err(AppError::NotFound(_))
        ));
    }
}
