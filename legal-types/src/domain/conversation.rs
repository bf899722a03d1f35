//! Conversation and turn domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::AccountId;
use crate::error::DomainError;

/// Maximum number of turns (user and bot messages together) per conversation.
pub const TURN_CAP: i64 = 30;

/// Number of characters of the first message kept as the conversation title.
const TITLE_CHARS: usize = 30;

define_id!(
    /// Unique identifier for a Conversation.
    ConversationId
);

define_id!(
    /// Unique identifier for a Turn.
    TurnId
);

/// A chat thread between one account and the legal assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Account that owns the conversation
    pub owner_id: AccountId,
    /// Derived from the first message
    pub title: String,
    /// Maximum number of turns
    pub turn_cap: i64,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Starts a conversation whose title is taken from the first message.
    pub fn start(owner_id: AccountId, first_message: &str) -> Result<Self, DomainError> {
        if first_message.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Message cannot be empty".into(),
            ));
        }

        Ok(Self {
            id: ConversationId::new(),
            owner_id,
            title: title_from(first_message),
            turn_cap: TURN_CAP,
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a conversation from database fields.
    pub fn from_parts(
        id: ConversationId,
        owner_id: AccountId,
        title: String,
        turn_cap: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title,
            turn_cap,
            created_at,
        }
    }

    /// Whether a new user turn reserving `reserve` slots still fits under the cap.
    pub fn accepts_exchange(&self, turn_count: i64, user_turns: i64, reserve: i64) -> bool {
        exchange_fits(self.turn_cap, turn_count, user_turns, reserve)
    }
}

/// Cap check shared by every store.
///
/// Each stored user turn holds `reserve` slots until its reply lands, so
/// replies still owed to in-flight exchanges count against `cap`.
pub fn exchange_fits(cap: i64, turn_count: i64, user_turns: i64, reserve: i64) -> bool {
    turn_count.max(user_turns * reserve) + reserve <= cap
}

/// Builds a conversation title from the first characters of a message.
pub fn title_from(message: &str) -> String {
    let message = message.trim();
    let mut title: String = message.chars().take(TITLE_CHARS).collect();
    if message.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Bot,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Bot => "bot",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TurnRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TurnRole::User),
            "bot" => Ok(TurnRole::Bot),
            other => Err(DomainError::ValidationError(format!(
                "Unknown turn role: {other}"
            ))),
        }
    }
}

/// One message within a conversation.
///
/// Turns are append-only; `position` is their canonical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub conversation_id: ConversationId,
    /// Zero-based index within the conversation
    pub position: i64,
    pub role: TurnRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// A user turn and the bot reply it reserves room for.
    pub const EXCHANGE_SIZE: i64 = 2;

    pub fn new(
        conversation_id: ConversationId,
        position: i64,
        role: TurnRole,
        message: String,
    ) -> Self {
        Self {
            id: TurnId::new(),
            conversation_id,
            position,
            role,
            message,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs a turn from database fields.
    pub fn from_parts(
        id: TurnId,
        conversation_id: ConversationId,
        position: i64,
        role: TurnRole,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            position,
            role,
            message,
            created_at,
        }
    }
}
