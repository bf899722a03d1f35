//! Shared database row types for SQLite and PostgreSQL.
//!
//! SQLite stores ids and timestamps as TEXT (UUID strings and RFC 3339),
//! PostgreSQL uses native `UUID` and `TIMESTAMPTZ`. Rows are generic over the
//! column representation so both adapters share one conversion path.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use legal_types::{
    Account, AccountId, Conversation, ConversationId, Currency, LawyerClient, LawyerProfile, Money,
    PaymentRecord, PaymentRecordId, RepoError, Turn, TurnId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Column conversions
// ─────────────────────────────────────────────────────────────────────────────

/// A column holding a UUID.
pub trait DbUuid {
    fn into_uuid(self) -> Result<Uuid, RepoError>;
}

impl DbUuid for Uuid {
    fn into_uuid(self) -> Result<Uuid, RepoError> {
        Ok(self)
    }
}

impl DbUuid for String {
    fn into_uuid(self) -> Result<Uuid, RepoError> {
        Uuid::parse_str(&self).map_err(|e| RepoError::Database(e.to_string()))
    }
}

/// A column holding a UTC timestamp.
pub trait DbTimestamp {
    fn into_utc(self) -> Result<DateTime<Utc>, RepoError>;
}

impl DbTimestamp for DateTime<Utc> {
    fn into_utc(self) -> Result<DateTime<Utc>, RepoError> {
        Ok(self)
    }
}

impl DbTimestamp for String {
    fn into_utc(self) -> Result<DateTime<Utc>, RepoError> {
        DateTime::parse_from_rfc3339(&self)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

fn optional_utc<T: DbTimestamp>(value: Option<T>) -> Result<Option<DateTime<Utc>>, RepoError> {
    value.map(DbTimestamp::into_utc).transpose()
}

/// Parses an enum stored as its string form.
pub fn parse_column<E>(s: &str) -> Result<E, RepoError>
where
    E: std::str::FromStr,
    E::Err: std::fmt::Display,
{
    s.parse()
        .map_err(|e: E::Err| RepoError::Database(e.to_string()))
}

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    parse_column(s)
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount<I, T> {
    pub id: I,
    pub name: String,
    pub email: String,
    pub country: String,
    pub kind: String,
    pub tier: String,
    pub password_hash: String,
    pub created_at: T,
}

/// Lawyer profile row from database.
#[derive(FromRow)]
pub struct DbLawyerProfile<I, T> {
    pub account_id: I,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub charge: Option<i64>,
    pub available_from: Option<T>,
    pub available_to: Option<T>,
}

/// Account joined with its lawyer profile.
#[derive(FromRow)]
pub struct DbLawyer<I, T> {
    pub id: I,
    pub name: String,
    pub email: String,
    pub country: String,
    pub kind: String,
    pub tier: String,
    pub password_hash: String,
    pub created_at: T,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub charge: Option<i64>,
    pub available_from: Option<T>,
    pub available_to: Option<T>,
}

/// Payment row from database.
#[derive(FromRow)]
pub struct DbPayment<I, T> {
    pub id: I,
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub sender_id: I,
    pub receiver_id: I,
    pub amount: i64,
    pub currency: String,
    pub purpose: String,
    pub success: bool,
    pub created_at: T,
}

/// A paying client joined with the payment that booked the lawyer.
#[derive(FromRow)]
pub struct DbLawyerClient<I, T> {
    pub id: I,
    pub name: String,
    pub email: String,
    pub country: String,
    pub amount: i64,
    pub currency: String,
    pub payment_date: T,
}

/// Conversation row from database.
#[derive(FromRow)]
pub struct DbConversation<I, T> {
    pub id: I,
    pub owner_id: I,
    pub title: String,
    pub turn_cap: i64,
    pub created_at: T,
}

/// Turn row from database.
#[derive(FromRow)]
pub struct DbTurn<I, T> {
    pub id: I,
    pub conversation_id: I,
    pub position: i64,
    pub role: String,
    pub message: String,
    pub created_at: T,
}

/// Single-count row for queries.
#[derive(FromRow)]
pub struct DbCount {
    pub count: i64,
}

/// Turn counts used by the cap check.
#[derive(FromRow)]
pub struct DbTurnCounts {
    pub count: i64,
    pub user_count: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl<I: DbUuid, T: DbTimestamp> DbAccount<I, T> {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, RepoError> {
        Ok(Account::from_parts(
            AccountId::from_uuid(self.id.into_uuid()?),
            self.name,
            self.email,
            self.country,
            parse_column(&self.kind)?,
            parse_column(&self.tier)?,
            self.password_hash,
            self.created_at.into_utc()?,
        ))
    }
}

impl<I: DbUuid, T: DbTimestamp> DbLawyerProfile<I, T> {
    /// Convert database row to domain LawyerProfile.
    pub fn into_domain(self) -> Result<LawyerProfile, RepoError> {
        Ok(LawyerProfile {
            account_id: AccountId::from_uuid(self.account_id.into_uuid()?),
            phone: self.phone,
            specialization: self.specialization,
            charge: self.charge,
            available_from: optional_utc(self.available_from)?,
            available_to: optional_utc(self.available_to)?,
        })
    }
}

impl<I: DbUuid, T: DbTimestamp> DbLawyer<I, T> {
    /// Split the joined row into account and profile.
    pub fn into_domain(self) -> Result<(Account, LawyerProfile), RepoError> {
        let id = AccountId::from_uuid(self.id.into_uuid()?);
        let account = Account::from_parts(
            id,
            self.name,
            self.email,
            self.country,
            parse_column(&self.kind)?,
            parse_column(&self.tier)?,
            self.password_hash,
            self.created_at.into_utc()?,
        );
        let profile = LawyerProfile {
            account_id: id,
            phone: self.phone,
            specialization: self.specialization,
            charge: self.charge,
            available_from: optional_utc(self.available_from)?,
            available_to: optional_utc(self.available_to)?,
        };
        Ok((account, profile))
    }
}

impl<I: DbUuid, T: DbTimestamp> DbPayment<I, T> {
    /// Convert database row to domain PaymentRecord.
    pub fn into_domain(self) -> Result<PaymentRecord, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;

        Ok(PaymentRecord {
            id: PaymentRecordId::from_uuid(self.id.into_uuid()?),
            gateway_payment_id: self.gateway_payment_id,
            gateway_order_id: self.gateway_order_id,
            sender_id: AccountId::from_uuid(self.sender_id.into_uuid()?),
            receiver_id: AccountId::from_uuid(self.receiver_id.into_uuid()?),
            amount,
            purpose: parse_column(&self.purpose)?,
            success: self.success,
            created_at: self.created_at.into_utc()?,
        })
    }
}

impl<I: DbUuid, T: DbTimestamp> DbLawyerClient<I, T> {
    /// Convert database row to domain LawyerClient.
    pub fn into_domain(self) -> Result<LawyerClient, RepoError> {
        let currency = parse_currency(&self.currency)?;
        Ok(LawyerClient {
            id: AccountId::from_uuid(self.id.into_uuid()?),
            name: self.name,
            email: self.email,
            country: self.country,
            amount_paid: Money::new(self.amount, currency).map_err(RepoError::Domain)?,
            payment_date: self.payment_date.into_utc()?,
        })
    }
}

impl<I: DbUuid, T: DbTimestamp> DbConversation<I, T> {
    /// Convert database row to domain Conversation.
    pub fn into_domain(self) -> Result<Conversation, RepoError> {
        Ok(Conversation::from_parts(
            ConversationId::from_uuid(self.id.into_uuid()?),
            AccountId::from_uuid(self.owner_id.into_uuid()?),
            self.title,
            self.turn_cap,
            self.created_at.into_utc()?,
        ))
    }
}

impl<I: DbUuid, T: DbTimestamp> DbTurn<I, T> {
    /// Convert database row to domain Turn.
    pub fn into_domain(self) -> Result<Turn, RepoError> {
        Ok(Turn::from_parts(
            TurnId::from_uuid(self.id.into_uuid()?),
            ConversationId::from_uuid(self.conversation_id.into_uuid()?),
            self.position,
            parse_column(&self.role)?,
            self.message,
            self.created_at.into_utc()?,
        ))
    }
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
pub fn map_insert_error(err: sqlx::Error, what: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(format!("{what} already exists"))
        }
        _ => RepoError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_columns_parse() {
        let id = Uuid::new_v4();
        assert_eq!(id.to_string().into_uuid().unwrap(), id);

        let now = Utc::now();
        let parsed = now.to_rfc3339().into_utc().unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_malformed_text_columns_are_database_errors() {
        assert!(matches!(
            "not-a-uuid".to_string().into_uuid(),
            Err(RepoError::Database(_))
        ));
        assert!(matches!(
            "yesterday".to_string().into_utc(),
            Err(RepoError::Database(_))
        ));
        assert!(matches!(
            parse_currency("XYZ"),
            Err(RepoError::Database(_))
        ));
    }
}
