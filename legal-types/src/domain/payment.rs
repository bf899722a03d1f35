//! Payment record domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::AccountId;
use super::money::Money;
use crate::error::DomainError;

define_id!(
    /// Unique identifier for a PaymentRecord.
    PaymentRecordId
);

/// What a payment was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPurpose {
    /// Upgrade of the payer's own tier to PREMIUM
    Subscription,
    /// Consultation fee paid to a lawyer
    LawyerBooking,
}

impl PaymentPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPurpose::Subscription => "SUBSCRIPTION",
            PaymentPurpose::LawyerBooking => "LAWYER_BOOKING",
        }
    }
}

impl std::fmt::Display for PaymentPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentPurpose {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBSCRIPTION" => Ok(PaymentPurpose::Subscription),
            "LAWYER_BOOKING" => Ok(PaymentPurpose::LawyerBooking),
            other => Err(DomainError::ValidationError(format!(
                "Unknown payment purpose: {other}"
            ))),
        }
    }
}

/// The state transition a verified payment triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentKind {
    /// Payer becomes PREMIUM.
    Subscription,
    /// Payer books a consultation with `payee`.
    Consultation { payee: AccountId },
}

impl PaymentKind {
    pub fn purpose(&self) -> PaymentPurpose {
        match self {
            PaymentKind::Subscription => PaymentPurpose::Subscription,
            PaymentKind::Consultation { .. } => PaymentPurpose::LawyerBooking,
        }
    }

    /// Account credited by the payment. A subscription is paid to oneself.
    pub fn receiver(&self, payer: AccountId) -> AccountId {
        match self {
            PaymentKind::Subscription => payer,
            PaymentKind::Consultation { payee } => *payee,
        }
    }
}

/// A completed payment.
///
/// Records are immutable once created and unique per gateway payment id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentRecordId,
    /// Payment id assigned by the gateway (idempotency key)
    pub gateway_payment_id: String,
    /// Order the payment settled
    pub gateway_order_id: String,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Money,
    pub purpose: PaymentPurpose,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Creates the record for a verified payment.
    pub fn settled(
        payer: AccountId,
        kind: PaymentKind,
        amount: Money,
        gateway_order_id: String,
        gateway_payment_id: String,
    ) -> Self {
        Self {
            id: PaymentRecordId::new(),
            gateway_payment_id,
            gateway_order_id,
            sender_id: payer,
            receiver_id: kind.receiver(payer),
            amount,
            purpose: kind.purpose(),
            success: true,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of settling a verified payment.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub record: PaymentRecord,
    /// True when the gateway payment id had already been settled and nothing
    /// was applied this time.
    pub replayed: bool,
}
