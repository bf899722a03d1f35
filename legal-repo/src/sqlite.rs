//! SQLite store adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;

use legal_types::{
    Account, AccountId, AccountStore, Conversation, ConversationId, LawyerClient, LawyerProfile,
    PaymentPurpose, PaymentRecord, RepoError, Settlement, Tier, Turn, TurnId, TurnRole,
};

use crate::types::{
    DbAccount, DbConversation, DbCount, DbLawyer, DbLawyerClient, DbLawyerProfile, DbPayment,
    DbTurn, map_insert_error,
};

type AccountRow = DbAccount<String, String>;
type LawyerRow = DbLawyer<String, String>;
type LawyerProfileRow = DbLawyerProfile<String, String>;
type PaymentRow = DbPayment<String, String>;
type LawyerClientRow = DbLawyerClient<String, String>;
type ConversationRow = DbConversation<String, String>;
type TurnRow = DbTurn<String, String>;

const MIGRATIONS: [(&str, &str); 3] = [
    ("0001", include_str!("../migrations/0001_create_accounts.sql")),
    ("0002", include_str!("../migrations/0002_create_payments.sql")),
    ("0003", include_str!("../migrations/0003_create_conversations.sql")),
];

/// Timestamps are stored as fixed-width RFC 3339 so TEXT ordering is chronological.
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite store implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        for (name, sql) in MIGRATIONS {
            for statement in sql.split(';') {
                let stmt = statement.trim();
                if stmt.is_empty() {
                    continue;
                }
                sqlx::query(stmt)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| RepoError::Database(format!("Migration {name} failed: {e}")))?;
            }
        }
        Ok(())
    }

    async fn insert_account<'c, E>(executor: E, account: &Account) -> Result<(), RepoError>
    where
        E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO accounts (id, name, email, country, kind, tier, password_hash, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.country)
        .bind(account.kind.as_str())
        .bind(account.tier.as_str())
        .bind(&account.password_hash)
        .bind(ts(account.created_at))
        .execute(executor)
        .await
        .map_err(|e| map_insert_error(e, "Account with this email"))?;
        Ok(())
    }

    async fn upsert_profile<'c, E>(executor: E, profile: &LawyerProfile) -> Result<(), RepoError>
    where
        E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r#"INSERT INTO lawyer_profiles (account_id, phone, specialization, charge, available_from, available_to)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(account_id) DO UPDATE SET
                   phone = excluded.phone,
                   specialization = excluded.specialization,
                   charge = excluded.charge,
                   available_from = excluded.available_from,
                   available_to = excluded.available_to"#,
        )
        .bind(profile.account_id.to_string())
        .bind(&profile.phone)
        .bind(&profile.specialization)
        .bind(profile.charge)
        .bind(profile.available_from.map(ts))
        .bind(profile.available_to.map(ts))
        .execute(executor)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    /// Tells apart a missing conversation from a full one after a refused insert.
    async fn refused_turn(&self, conversation_id: ConversationId) -> RepoError {
        match self.find_conversation_by_id(conversation_id).await {
            Ok(Some(conversation)) => RepoError::TurnCapReached {
                conversation_id,
                cap: conversation.turn_cap,
            },
            Ok(None) => RepoError::NotFound,
            Err(e) => e,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountStore for SqliteRepo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        Self::insert_account(&self.pool, &account).await?;
        Ok(account)
    }

    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"SELECT id, name, email, country, kind, tier, password_hash, created_at FROM accounts WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"SELECT id, name, email, country, kind, tier, password_hash, created_at FROM accounts WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn update_account(&self, account: &Account) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE accounts SET name = ?, country = ?, password_hash = ? WHERE id = ?"#,
        )
        .bind(&account.name)
        .bind(&account.country)
        .bind(&account.password_hash)
        .bind(account.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_account_tier(&self, id: AccountId, tier: Tier) -> Result<(), RepoError> {
        let result = sqlx::query(r#"UPDATE accounts SET tier = ? WHERE id = ?"#)
            .bind(tier.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn create_lawyer(
        &self,
        account: Account,
        profile: LawyerProfile,
    ) -> Result<(Account, LawyerProfile), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Self::insert_account(&mut *db_tx, &account).await?;
        Self::upsert_profile(&mut *db_tx, &profile).await?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok((account, profile))
    }

    async fn save_lawyer_profile(&self, profile: &LawyerProfile) -> Result<(), RepoError> {
        Self::upsert_profile(&self.pool, profile).await
    }

    async fn find_lawyer_profile(
        &self,
        account_id: AccountId,
    ) -> Result<Option<LawyerProfile>, RepoError> {
        let row: Option<LawyerProfileRow> = sqlx::query_as(
            r#"SELECT account_id, phone, specialization, charge, available_from, available_to
               FROM lawyer_profiles WHERE account_id = ?"#,
        )
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbLawyerProfile::into_domain).transpose()
    }

    async fn list_available_lawyers(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Account, LawyerProfile)>, RepoError> {
        let now = ts(now);
        let rows: Vec<LawyerRow> = sqlx::query_as(
            r#"SELECT a.id, a.name, a.email, a.country, a.kind, a.tier, a.password_hash, a.created_at,
                      p.phone, p.specialization, p.charge, p.available_from, p.available_to
               FROM accounts a
               JOIN lawyer_profiles p ON p.account_id = a.id
               WHERE a.kind = 'LAWYER' AND p.available_from <= ? AND p.available_to >= ?
               ORDER BY CASE a.tier WHEN 'PREMIUM' THEN 0 ELSE 1 END, p.available_to DESC"#,
        )
        .bind(&now)
        .bind(&now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLawyer::into_domain).collect()
    }

    async fn list_lawyer_clients(
        &self,
        lawyer: AccountId,
    ) -> Result<Vec<LawyerClient>, RepoError> {
        let rows: Vec<LawyerClientRow> = sqlx::query_as(
            r#"SELECT a.id, a.name, a.email, a.country, p.amount, p.currency, p.created_at AS payment_date
               FROM payments p
               JOIN accounts a ON a.id = p.sender_id
               WHERE p.receiver_id = ? AND p.purpose = ? AND p.success = 1
               ORDER BY p.created_at DESC"#,
        )
        .bind(lawyer.to_string())
        .bind(PaymentPurpose::LawyerBooking.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLawyerClient::into_domain).collect()
    }

    async fn create_payment_record(
        &self,
        record: PaymentRecord,
    ) -> Result<PaymentRecord, RepoError> {
        sqlx::query(
            r#"INSERT INTO payments (id, gateway_payment_id, gateway_order_id, sender_id, receiver_id, amount, currency, purpose, success, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.gateway_payment_id)
        .bind(&record.gateway_order_id)
        .bind(record.sender_id.to_string())
        .bind(record.receiver_id.to_string())
        .bind(record.amount.amount())
        .bind(record.amount.currency().to_string())
        .bind(record.purpose.as_str())
        .bind(record.success)
        .bind(ts(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Payment"))?;

        Ok(record)
    }

    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"SELECT id, gateway_payment_id, gateway_order_id, sender_id, receiver_id, amount, currency, purpose, success, created_at
               FROM payments WHERE gateway_payment_id = ?"#,
        )
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn settle_payment(&self, record: PaymentRecord) -> Result<Settlement, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        let result = sqlx::query(
            r#"INSERT INTO payments (id, gateway_payment_id, gateway_order_id, sender_id, receiver_id, amount, currency, purpose, success, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(gateway_payment_id) DO NOTHING"#,
        )
        .bind(record.id.to_string())
        .bind(&record.gateway_payment_id)
        .bind(&record.gateway_order_id)
        .bind(record.sender_id.to_string())
        .bind(record.receiver_id.to_string())
        .bind(record.amount.amount())
        .bind(record.amount.currency().to_string())
        .bind(record.purpose.as_str())
        .bind(record.success)
        .bind(ts(record.created_at))
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            let existing: PaymentRow = sqlx::query_as(
                r#"SELECT id, gateway_payment_id, gateway_order_id, sender_id, receiver_id, amount, currency, purpose, success, created_at
                   FROM payments WHERE gateway_payment_id = ?"#,
            )
            .bind(&record.gateway_payment_id)
            .fetch_one(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            db_tx
                .commit()
                .await
                .map_err(|e| RepoError::Transaction(e.to_string()))?;

            return Ok(Settlement {
                record: existing.into_domain()?,
                replayed: true,
            });
        }

        if record.purpose == PaymentPurpose::Subscription {
            let result = sqlx::query(r#"UPDATE accounts SET tier = ? WHERE id = ?"#)
                .bind(Tier::Premium.as_str())
                .bind(record.sender_id.to_string())
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(Settlement {
            record,
            replayed: false,
        })
    }

    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, RepoError> {
        sqlx::query(
            r#"INSERT INTO conversations (id, owner_id, title, turn_cap, created_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(conversation.owner_id.to_string())
        .bind(&conversation.title)
        .bind(conversation.turn_cap)
        .bind(ts(conversation.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(conversation)
    }

    async fn find_conversation_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepoError> {
        let row: Option<ConversationRow> = sqlx::query_as(
            r#"SELECT id, owner_id, title, turn_cap, created_at FROM conversations WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbConversation::into_domain).transpose()
    }

    async fn list_conversations_for_account(
        &self,
        owner: AccountId,
    ) -> Result<Vec<Conversation>, RepoError> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            r#"SELECT id, owner_id, title, turn_cap, created_at FROM conversations
               WHERE owner_id = ? ORDER BY created_at DESC"#,
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbConversation::into_domain).collect()
    }

    async fn count_turns(&self, conversation_id: ConversationId) -> Result<i64, RepoError> {
        let row: DbCount =
            sqlx::query_as(r#"SELECT COUNT(*) AS count FROM turns WHERE conversation_id = ?"#)
                .bind(conversation_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.count)
    }

    async fn append_turn(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
    ) -> Result<Turn, RepoError> {
        let mut turn = Turn::new(conversation_id, 0, role, message.to_string());

        let position: Option<(i64,)> = sqlx::query_as(
            r#"INSERT INTO turns (id, conversation_id, position, role, message, created_at)
               SELECT ?, c.id,
                      COALESCE((SELECT MAX(position) FROM turns WHERE conversation_id = c.id), -1) + 1,
                      ?, ?, ?
               FROM conversations c
               WHERE c.id = ?
               RETURNING position"#,
        )
        .bind(turn.id.to_string())
        .bind(role.as_str())
        .bind(message)
        .bind(ts(turn.created_at))
        .bind(conversation_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        turn.position = position.ok_or(RepoError::NotFound)?.0;
        Ok(turn)
    }

    async fn append_turn_within_cap(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
        reserve: i64,
    ) -> Result<Turn, RepoError> {
        let mut turn = Turn::new(conversation_id, 0, role, message.to_string());

        // One statement, so the count check and the insert cannot interleave
        // with another writer. Same rule as `exchange_fits`: every user turn
        // holds ?6 slots until its reply is stored.
        let position: Option<(i64,)> = sqlx::query_as(
            r#"INSERT INTO turns (id, conversation_id, position, role, message, created_at)
               SELECT ?1, c.id,
                      COALESCE((SELECT MAX(position) FROM turns WHERE conversation_id = c.id), -1) + 1,
                      ?2, ?3, ?4
               FROM conversations c
               WHERE c.id = ?5
                 AND MAX(
                       (SELECT COUNT(*) FROM turns WHERE conversation_id = c.id),
                       ?6 * (SELECT COUNT(*) FROM turns WHERE conversation_id = c.id AND role = 'user')
                     ) + ?6 <= c.turn_cap
               RETURNING position"#,
        )
        .bind(turn.id.to_string())
        .bind(role.as_str())
        .bind(message)
        .bind(ts(turn.created_at))
        .bind(conversation_id.to_string())
        .bind(reserve)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        match position {
            Some((position,)) => {
                turn.position = position;
                Ok(turn)
            }
            None => Err(self.refused_turn(conversation_id).await),
        }
    }

    async fn delete_turn(&self, id: TurnId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM turns WHERE id = ?"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_turns(
        &self,
        conversation_id: ConversationId,
        limit: i64,
    ) -> Result<Vec<Turn>, RepoError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            r#"SELECT id, conversation_id, position, role, message, created_at FROM turns
               WHERE conversation_id = ? ORDER BY position ASC LIMIT ?"#,
        )
        .bind(conversation_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTurn::into_domain).collect()
    }
}
