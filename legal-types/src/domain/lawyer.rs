//! Lawyer profile domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::money::Money;

/// Professional details attached to a `LAWYER` account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LawyerProfile {
    pub account_id: AccountId,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    /// Consultation charge in major currency units
    pub charge: Option<i64>,
    pub available_from: Option<DateTime<Utc>>,
    pub available_to: Option<DateTime<Utc>>,
}

impl LawyerProfile {
    pub fn empty(account_id: AccountId) -> Self {
        Self {
            account_id,
            ..Default::default()
        }
    }

    /// True when `now` falls inside the availability window.
    ///
    /// Lawyers without a complete window are never listed as available.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        match (self.available_from, self.available_to) {
            (Some(from), Some(to)) => from <= now && now <= to,
            _ => false,
        }
    }

    /// Charge in major units, falling back to `default` when unset.
    pub fn consultation_charge(&self, default: i64) -> i64 {
        self.charge.unwrap_or(default)
    }
}

/// A client who paid a lawyer for a consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawyerClient {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub country: String,
    pub amount_paid: Money,
    pub payment_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_availability_window() {
        let now = Utc::now();
        let profile = LawyerProfile {
            available_from: Some(now - Duration::hours(1)),
            available_to: Some(now + Duration::hours(1)),
            ..LawyerProfile::empty(AccountId::new())
        };

        assert!(profile.is_available_at(now));
        assert!(!profile.is_available_at(now + Duration::hours(2)));
    }

    #[test]
    fn test_open_window_is_unavailable() {
        let profile = LawyerProfile {
            available_from: Some(Utc::now()),
            ..LawyerProfile::empty(AccountId::new())
        };
        assert!(!profile.is_available_at(Utc::now()));
    }

    #[test]
    fn test_charge_falls_back_to_default() {
        let mut profile = LawyerProfile::empty(AccountId::new());
        assert_eq!(profile.consultation_charge(1000), 1000);

        profile.charge = Some(2500);
        assert_eq!(profile.consultation_charge(1000), 2500);
    }
}
