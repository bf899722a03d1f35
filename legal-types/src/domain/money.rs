//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Currencies the payment gateway is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Number of minor units in one major unit (paise per rupee, cents per dollar).
    pub fn minor_units_per_major(&self) -> i64 {
        match self {
            Currency::INR | Currency::USD | Currency::EUR | Currency::GBP => 100,
        }
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(DomainError::ValidationError(format!(
                "Unsupported currency: {other}"
            ))),
        }
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (paise, cents, etc.)
/// which is also what the payment gateway expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value from minor units.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Creates a Money value from major units (e.g. a lawyer's charge in rupees).
    pub fn from_major(major: i64, currency: Currency) -> Result<Self, DomainError> {
        let amount = major
            .checked_mul(currency.minor_units_per_major())
            .ok_or(DomainError::AmountOverflow)?;
        Self::new(amount, currency)
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_major = self.currency.minor_units_per_major();
        let major = self.amount / per_major;
        let minor = (self.amount % per_major).abs();
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::new(29900, Currency::INR).unwrap();
        assert_eq!(money.amount(), 29900);
        assert_eq!(money.currency(), Currency::INR);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100, Currency::INR);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_from_major_converts_to_minor_units() {
        let money = Money::from_major(1000, Currency::INR).unwrap();
        assert_eq!(money.amount(), 100_000);
    }

    #[test]
    fn test_from_major_overflow() {
        let result = Money::from_major(i64::MAX, Currency::INR);
        assert!(matches!(result, Err(DomainError::AmountOverflow)));
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(29950, Currency::INR).unwrap();
        assert_eq!(format!("{}", money), "₹299.50");
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::INR);
        assert!("XYZ".parse::<Currency>().is_err());
    }
}
