//! PostgreSQL store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use legal_types::{
    Account, AccountId, AccountStore, Conversation, ConversationId, LawyerClient, LawyerProfile,
    PaymentPurpose, PaymentRecord, RepoError, Settlement, Tier, Turn, TurnId, TurnRole,
    exchange_fits,
};

use crate::types::{
    DbAccount, DbConversation, DbCount, DbLawyer, DbLawyerClient, DbLawyerProfile, DbPayment,
    DbTurn, DbTurnCounts, map_insert_error,
};

type AccountRow = DbAccount<Uuid, DateTime<Utc>>;
type LawyerRow = DbLawyer<Uuid, DateTime<Utc>>;
type LawyerProfileRow = DbLawyerProfile<Uuid, DateTime<Utc>>;
type PaymentRow = DbPayment<Uuid, DateTime<Utc>>;
type LawyerClientRow = DbLawyerClient<Uuid, DateTime<Utc>>;
type ConversationRow = DbConversation<Uuid, DateTime<Utc>>;
type TurnRow = DbTurn<Uuid, DateTime<Utc>>;

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL store with row-level locking.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_accounts_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payments_pg.sql"),
        "0002",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0003_create_conversations_pg.sql"),
        "0003",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }

    async fn insert_account<'c, E>(executor: E, account: &Account) -> Result<(), RepoError>
    where
        E: sqlx::Executor<'c, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"INSERT INTO accounts (id, name, email, country, kind, tier, password_hash, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(account.id.into_uuid())
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.country)
        .bind(account.kind.as_str())
        .bind(account.tier.as_str())
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(executor)
        .await
        .map_err(|e| map_insert_error(e, "Account with this email"))?;
        Ok(())
    }

    async fn upsert_profile<'c, E>(executor: E, profile: &LawyerProfile) -> Result<(), RepoError>
    where
        E: sqlx::Executor<'c, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"INSERT INTO lawyer_profiles (account_id, phone, specialization, charge, available_from, available_to)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (account_id) DO UPDATE SET
                   phone = EXCLUDED.phone,
                   specialization = EXCLUDED.specialization,
                   charge = EXCLUDED.charge,
                   available_from = EXCLUDED.available_from,
                   available_to = EXCLUDED.available_to"#,
        )
        .bind(profile.account_id.into_uuid())
        .bind(&profile.phone)
        .bind(&profile.specialization)
        .bind(profile.charge)
        .bind(profile.available_from)
        .bind(profile.available_to)
        .execute(executor)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }

    /// Appends a turn while holding a lock on the conversation row.
    async fn insert_turn_locked(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
        reserve: Option<i64>,
    ) -> Result<Turn, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Lock the conversation with FOR UPDATE
        let cap: Option<(i64,)> =
            sqlx::query_as(r#"SELECT turn_cap FROM conversations WHERE id = $1 FOR UPDATE"#)
                .bind(conversation_id.into_uuid())
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        let (cap,) = cap.ok_or(RepoError::NotFound)?;

        if let Some(reserve) = reserve {
            let row: DbTurnCounts = sqlx::query_as(
                r#"SELECT COUNT(*) AS count,
                          COUNT(*) FILTER (WHERE role = 'user') AS user_count
                   FROM turns WHERE conversation_id = $1"#,
            )
            .bind(conversation_id.into_uuid())
            .fetch_one(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            if !exchange_fits(cap, row.count, row.user_count, reserve) {
                return Err(RepoError::TurnCapReached {
                    conversation_id,
                    cap,
                });
            }
        }

        let mut turn = Turn::new(conversation_id, 0, role, message.to_string());

        let (position,): (i64,) = sqlx::query_as(
            r#"INSERT INTO turns (id, conversation_id, position, role, message, created_at)
               VALUES ($1, $2,
                       (SELECT COALESCE(MAX(position), -1) + 1 FROM turns WHERE conversation_id = $2),
                       $3, $4, $5)
               RETURNING position"#,
        )
        .bind(turn.id.into_uuid())
        .bind(conversation_id.into_uuid())
        .bind(role.as_str())
        .bind(message)
        .bind(turn.created_at)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        turn.position = position;
        Ok(turn)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountStore for PostgresRepo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        Self::insert_account(&self.pool, &account).await?;
        Ok(account)
    }

    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"SELECT id, name, email, country, kind, tier, password_hash, created_at FROM accounts WHERE id = $1"#,
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"SELECT id, name, email, country, kind, tier, password_hash, created_at FROM accounts WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn update_account(&self, account: &Account) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE accounts SET name = $1, country = $2, password_hash = $3 WHERE id = $4"#,
        )
        .bind(&account.name)
        .bind(&account.country)
        .bind(&account.password_hash)
        .bind(account.id.into_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_account_tier(&self, id: AccountId, tier: Tier) -> Result<(), RepoError> {
        let result = sqlx::query(r#"UPDATE accounts SET tier = $1 WHERE id = $2"#)
            .bind(tier.as_str())
            .bind(id.into_uuid())
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
               FROM lawyer_profiles WHERE account_id = $1"#,
        )
        .bind(account_id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbLawyerProfile::into_domain).transpose()
    }

    async fn list_available_lawyers(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Account, LawyerProfile)>, RepoError> {
        let rows: Vec<LawyerRow> = sqlx::query_as(
            r#"SELECT a.id, a.name, a.email, a.country, a.kind, a.tier, a.password_hash, a.created_at,
                      p.phone, p.specialization, p.charge, p.available_from, p.available_to
               FROM accounts a
               JOIN lawyer_profiles p ON p.account_id = a.id
               WHERE a.kind = 'LAWYER' AND p.available_from <= $1 AND p.available_to >= $1
               ORDER BY CASE a.tier WHEN 'PREMIUM' THEN 0 ELSE 1 END, p.available_to DESC"#,
        )
        .bind(now)
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
               WHERE p.receiver_id = $1 AND p.purpose = $2 AND p.success
               ORDER BY p.created_at DESC"#,
        )
        .bind(lawyer.into_uuid())
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
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(record.id.into_uuid())
        .bind(&record.gateway_payment_id)
        .bind(&record.gateway_order_id)
        .bind(record.sender_id.into_uuid())
        .bind(record.receiver_id.into_uuid())
        .bind(record.amount.amount())
        .bind(record.amount.currency().to_string())
        .bind(record.purpose.as_str())
        .bind(record.success)
        .bind(record.created_at)
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
               FROM payments WHERE gateway_payment_id = $1"#,
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
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (gateway_payment_id) DO NOTHING"#,
        )
        .bind(record.id.into_uuid())
        .bind(&record.gateway_payment_id)
        .bind(&record.gateway_order_id)
        .bind(record.sender_id.into_uuid())
        .bind(record.receiver_id.into_uuid())
        .bind(record.amount.amount())
        .bind(record.amount.currency().to_string())
        .bind(record.purpose.as_str())
        .bind(record.success)
        .bind(record.created_at)
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            let existing: PaymentRow = sqlx::query_as(
                r#"SELECT id, gateway_payment_id, gateway_order_id, sender_id, receiver_id, amount, currency, purpose, success, created_at
                   FROM payments WHERE gateway_payment_id = $1"#,
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
            let result = sqlx::query(r#"UPDATE accounts SET tier = $1 WHERE id = $2"#)
                .bind(Tier::Premium.as_str())
                .bind(record.sender_id.into_uuid())
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
            r#"INSERT INTO conversations (id, owner_id, title, turn_cap, created_at) VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(conversation.id.into_uuid())
        .bind(conversation.owner_id.into_uuid())
        .bind(&conversation.title)
        .bind(conversation.turn_cap)
        .bind(conversation.created_at)
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
            r#"SELECT id, owner_id, title, turn_cap, created_at FROM conversations WHERE id = $1"#,
        )
        .bind(id.into_uuid())
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
               WHERE owner_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(owner.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbConversation::into_domain).collect()
    }

    async fn count_turns(&self, conversation_id: ConversationId) -> Result<i64, RepoError> {
        let row: DbCount =
            sqlx::query_as(r#"SELECT COUNT(*) AS count FROM turns WHERE conversation_id = $1"#)
                .bind(conversation_id.into_uuid())
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
        self.insert_turn_locked(conversation_id, role, message, None)
            .await
    }

    async fn append_turn_within_cap(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
        reserve: i64,
    ) -> Result<Turn, RepoError> {
        self.insert_turn_locked(conversation_id, role, message, Some(reserve))
            .await
    }

    async fn delete_turn(&self, id: TurnId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"DELETE FROM turns WHERE id = $1"#)
            .bind(id.into_uuid())
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
               WHERE conversation_id = $1 ORDER BY position ASC LIMIT $2"#,
        )
        .bind(conversation_id.into_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbTurn::into_domain).collect()
    }
}
