//! Account store port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory) implement this trait.

use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, Conversation, ConversationId, LawyerClient, LawyerProfile, PaymentRecord,
    Settlement, Tier, Turn, TurnId, TurnRole,
};
use crate::error::RepoError;

/// The persistence port for accounts, payments and conversations.
///
/// Operations documented as atomic MUST NOT be split into separate
/// read and write round-trips by implementations.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a new account. Fails with `Conflict` when the email is taken.
    async fn create_account(&self, account: Account) -> Result<Account, RepoError>;

    /// Gets an account by ID.
    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    /// Gets an account by (normalized) email.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError>;

    /// Persists name, country and password hash of an existing account.
    ///
    /// The tier is left untouched; it only changes through payments.
    async fn update_account(&self, account: &Account) -> Result<(), RepoError>;

    /// Sets the subscription tier. Fails with `NotFound` for unknown accounts.
    async fn update_account_tier(&self, id: AccountId, tier: Tier) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Lawyer Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a lawyer account and its profile in one transaction.
    async fn create_lawyer(
        &self,
        account: Account,
        profile: LawyerProfile,
    ) -> Result<(Account, LawyerProfile), RepoError>;

    /// Inserts or replaces a lawyer profile.
    async fn save_lawyer_profile(&self, profile: &LawyerProfile) -> Result<(), RepoError>;

    /// Gets the profile of a lawyer account.
    async fn find_lawyer_profile(
        &self,
        account_id: AccountId,
    ) -> Result<Option<LawyerProfile>, RepoError>;

    /// Lawyers whose availability window contains `now`,
    /// PREMIUM first, then by `available_to` descending.
    async fn list_available_lawyers(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Account, LawyerProfile)>, RepoError>;

    /// Clients with a successful consultation payment to this lawyer.
    async fn list_lawyer_clients(&self, lawyer: AccountId)
    -> Result<Vec<LawyerClient>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a payment record. Fails with `Conflict` when the gateway payment id exists.
    async fn create_payment_record(&self, record: PaymentRecord)
    -> Result<PaymentRecord, RepoError>;

    /// Finds a payment record by its gateway payment id.
    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError>;

    /// Applies a verified payment exactly once (atomic).
    ///
    /// Inserts `record` unless its gateway payment id is already settled and,
    /// for subscriptions, upgrades the sender to PREMIUM in the same
    /// transaction. A replay returns the existing record with `replayed = true`.
    async fn settle_payment(&self, record: PaymentRecord) -> Result<Settlement, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversation Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a new conversation.
    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, RepoError>;

    /// Gets a conversation by ID.
    async fn find_conversation_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepoError>;

    /// Lists conversations of an account, newest first.
    async fn list_conversations_for_account(
        &self,
        owner: AccountId,
    ) -> Result<Vec<Conversation>, RepoError>;

    /// Counts the turns of a conversation.
    async fn count_turns(&self, conversation_id: ConversationId) -> Result<i64, RepoError>;

    /// Appends a turn after the current last one.
    async fn append_turn(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
    ) -> Result<Turn, RepoError>;

    /// Appends a turn only if `count + reserve <= cap` (atomic).
    ///
    /// Fails with `TurnCapReached` otherwise and with `NotFound` for unknown
    /// conversations.
    async fn append_turn_within_cap(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
        reserve: i64,
    ) -> Result<Turn, RepoError>;

    /// Removes a turn. Returns false when it did not exist.
    async fn delete_turn(&self, id: TurnId) -> Result<bool, RepoError>;

    /// Up to `limit` turns of a conversation in canonical order.
    async fn list_turns(
        &self,
        conversation_id: ConversationId,
        limit: i64,
    ) -> Result<Vec<Turn>, RepoError>;
}
