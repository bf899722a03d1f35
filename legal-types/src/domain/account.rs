//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

define_id!(
    /// Unique identifier for an Account (client or lawyer).
    AccountId
);

/// Whether the account belongs to a client seeking advice or to a lawyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Client,
    Lawyer,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Client => "CLIENT",
            AccountKind::Lawyer => "LAWYER",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLIENT" => Ok(AccountKind::Client),
            "LAWYER" => Ok(AccountKind::Lawyer),
            other => Err(DomainError::ValidationError(format!(
                "Unknown account kind: {other}"
            ))),
        }
    }
}

/// Subscription tier of an account.
///
/// Ordered so that `Premium > Free`, which lawyer discovery relies on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Premium => "PREMIUM",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(Tier::Free),
            "PREMIUM" => Ok(Tier::Premium),
            other => Err(DomainError::ValidationError(format!("Unknown tier: {other}"))),
        }
    }
}

/// A registered user of the service.
///
/// The password hash never leaves the service; API responses are built from
/// [`crate::dto::AccountResponse`].
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Display name
    pub name: String,
    /// Login email, unique across accounts
    pub email: String,
    /// Country used to localize legal answers
    pub country: String,
    pub kind: AccountKind,
    pub tier: Tier,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new FREE account.
    ///
    /// # Validation
    /// - Name, email and country cannot be empty
    /// - Email must contain `@`
    pub fn new(
        name: String,
        email: String,
        country: String,
        kind: AccountKind,
        password_hash: String,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() || country.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Name and country cannot be empty".into(),
            ));
        }
        let email = normalize_email(&email);
        if !email.contains('@') {
            return Err(DomainError::ValidationError(format!(
                "Invalid email address: {email}"
            )));
        }

        Ok(Self {
            id: AccountId::new(),
            name: name.trim().to_string(),
            email,
            country: country.trim().to_string(),
            kind,
            tier: Tier::Free,
            password_hash,
            created_at: Utc::now(),
        })
    }

    /// Creates an account with all fields specified (for database reconstruction).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: AccountId,
        name: String,
        email: String,
        country: String,
        kind: AccountKind,
        tier: Tier,
        password_hash: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            country,
            kind,
            tier,
            password_hash,
            created_at,
        }
    }

    pub fn is_lawyer(&self) -> bool {
        self.kind == AccountKind::Lawyer
    }

    pub fn is_premium(&self) -> bool {
        self.tier == Tier::Premium
    }
}

/// Lower-cases and trims an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
