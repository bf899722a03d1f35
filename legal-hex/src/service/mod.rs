//! Application services.
//!
//! Orchestrate domain operations through the store port and the upstream
//! ports. Contain NO infrastructure logic - pure business orchestration.

mod accounts;
mod chat;
mod payments;

pub use accounts::{AccountService, AccountSettings};
pub use chat::{ChatService, NO_REPLY, system_instruction};
pub use payments::{PaymentService, PaymentSettings};

use legal_types::AppError;

/// Fails with `MissingFields` naming every blank field.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> Result<(), AppError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing.join(", ")))
    }
}
