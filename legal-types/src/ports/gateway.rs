//! Payment gateway port.
//!
//! This trait defines the interface for the hosted checkout provider.
//! Implementations can be HTTP clients, in-memory fakes, etc.

use std::collections::BTreeMap;

use crate::domain::{AccountId, Money, PaymentKind};

/// Error type for payment gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected gateway response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Api { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            GatewayError::Decode(_) => false,
        }
    }
}

/// Who pays and what for, attached to a gateway order.
///
/// The gateway stores notes as flat string pairs; they come back verbatim
/// when the order is fetched during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderNotes {
    pub payer: AccountId,
    pub kind: PaymentKind,
}

impl OrderNotes {
    const PAYER: &'static str = "payer_id";
    const PURPOSE: &'static str = "purpose";
    const PAYEE: &'static str = "payee_id";

    pub fn into_map(self) -> BTreeMap<String, String> {
        let mut notes = BTreeMap::new();
        notes.insert(Self::PAYER.to_string(), self.payer.to_string());
        match self.kind {
            PaymentKind::Subscription => {
                notes.insert(Self::PURPOSE.to_string(), "subscription".to_string());
            }
            PaymentKind::Consultation { payee } => {
                notes.insert(Self::PURPOSE.to_string(), "consultation".to_string());
                notes.insert(Self::PAYEE.to_string(), payee.to_string());
            }
        }
        notes
    }

    /// Parses notes written by [`OrderNotes::into_map`]; `None` when malformed.
    pub fn from_map(notes: &BTreeMap<String, String>) -> Option<Self> {
        let payer = notes.get(Self::PAYER)?.parse().ok()?;
        let kind = match notes.get(Self::PURPOSE)?.as_str() {
            "subscription" => PaymentKind::Subscription,
            "consultation" => PaymentKind::Consultation {
                payee: notes.get(Self::PAYEE)?.parse().ok()?,
            },
            _ => return None,
        };
        Some(Self { payer, kind })
    }
}

/// Request to open a checkout order.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub amount: Money,
    /// Unique receipt token
    pub receipt: String,
    pub notes: OrderNotes,
}

/// An order as known by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Money,
    pub receipt: Option<String>,
    /// `None` when the order carries no (or unparseable) notes
    pub notes: Option<OrderNotes>,
}

/// Port trait for payment gateways.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens an order the client can pay in the hosted checkout.
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Fetches an existing order by id.
    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consultation_notes_parse_back() {
        let notes = OrderNotes {
            payer: AccountId::new(),
            kind: PaymentKind::Consultation {
                payee: AccountId::new(),
            },
        };
        assert_eq!(OrderNotes::from_map(&notes.into_map()), Some(notes));
    }

    #[test]
    fn test_consultation_without_payee_is_malformed() {
        let mut map = OrderNotes {
            payer: AccountId::new(),
            kind: PaymentKind::Subscription,
        }
        .into_map();
        map.insert("purpose".into(), "consultation".into());

        assert_eq!(OrderNotes::from_map(&map), None);
    }

    #[test]
    fn test_unknown_purpose_is_malformed() {
        let mut map = BTreeMap::new();
        map.insert("payer_id".into(), AccountId::new().to_string());
        map.insert("purpose".into(), "donation".into());

        assert_eq!(OrderNotes::from_map(&map), None);
    }

    #[test]
    fn test_transient_errors() {
        assert!(GatewayError::Transport("reset".into()).is_transient());
        assert!(
            GatewayError::Api {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !GatewayError::Api {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
    }
}
