//! In-memory store adapter.
//!
//! Everything lives behind one mutex, so each operation is atomic. Used by
//! tests and for running the server without a database (`memory://`).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use legal_types::{
    Account, AccountId, AccountStore, Conversation, ConversationId, LawyerClient, LawyerProfile,
    PaymentPurpose, PaymentRecord, RepoError, Settlement, Tier, Turn, TurnId, TurnRole,
};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    profiles: HashMap<AccountId, LawyerProfile>,
    /// Keyed by gateway payment id
    payments: HashMap<String, PaymentRecord>,
    conversations: HashMap<ConversationId, Conversation>,
    turns: HashMap<ConversationId, Vec<Turn>>,
}

impl State {
    fn email_taken(&self, email: &str) -> bool {
        self.accounts.values().any(|a| a.email == email)
    }

    fn push_turn(
        &mut self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
    ) -> Turn {
        let turns = self.turns.entry(conversation_id).or_default();
        let position = turns.last().map_or(0, |t| t.position + 1);
        let turn = Turn::new(conversation_id, position, role, message.to_string());
        turns.push(turn.clone());
        turn
    }
}

/// Store backed by process memory.
#[derive(Default)]
pub struct MemoryRepo {
    state: Mutex<State>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, RepoError> {
        self.state
            .lock()
            .map_err(|_| RepoError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl AccountStore for MemoryRepo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        let mut state = self.lock()?;
        if state.email_taken(&account.email) {
            return Err(RepoError::Conflict(
                "Account with this email already exists".into(),
            ));
        }
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account_by_id(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepoError> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<(), RepoError> {
        let mut state = self.lock()?;
        let stored = state
            .accounts
            .get_mut(&account.id)
            .ok_or(RepoError::NotFound)?;
        stored.name = account.name.clone();
        stored.country = account.country.clone();
        stored.password_hash = account.password_hash.clone();
        Ok(())
    }

    async fn update_account_tier(&self, id: AccountId, tier: Tier) -> Result<(), RepoError> {
        let mut state = self.lock()?;
        state.accounts.get_mut(&id).ok_or(RepoError::NotFound)?.tier = tier;
        Ok(())
    }

    async fn create_lawyer(
        &self,
        account: Account,
        profile: LawyerProfile,
    ) -> Result<(Account, LawyerProfile), RepoError> {
        let mut state = self.lock()?;
        if state.email_taken(&account.email) {
            return Err(RepoError::Conflict(
                "Account with this email already exists".into(),
            ));
        }
        state.accounts.insert(account.id, account.clone());
        state.profiles.insert(profile.account_id, profile.clone());
        Ok((account, profile))
    }

    async fn save_lawyer_profile(&self, profile: &LawyerProfile) -> Result<(), RepoError> {
        let mut state = self.lock()?;
        if !state.accounts.contains_key(&profile.account_id) {
            return Err(RepoError::NotFound);
        }
        state.profiles.insert(profile.account_id, profile.clone());
        Ok(())
    }

    async fn find_lawyer_profile(
        &self,
        account_id: AccountId,
    ) -> Result<Option<LawyerProfile>, RepoError> {
        Ok(self.lock()?.profiles.get(&account_id).cloned())
    }

    async fn list_available_lawyers(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Account, LawyerProfile)>, RepoError> {
        let state = self.lock()?;
        let mut lawyers: Vec<(Account, LawyerProfile)> = state
            .profiles
            .values()
            .filter(|p| p.is_available_at(now))
            .filter_map(|p| {
                state
                    .accounts
                    .get(&p.account_id)
                    .filter(|a| a.is_lawyer())
                    .map(|a| (a.clone(), p.clone()))
            })
            .collect();

        lawyers.sort_by(|(a, p), (b, q)| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| q.available_to.cmp(&p.available_to))
        });
        Ok(lawyers)
    }

    async fn list_lawyer_clients(
        &self,
        lawyer: AccountId,
    ) -> Result<Vec<LawyerClient>, RepoError> {
        let state = self.lock()?;
        let mut payments: Vec<&PaymentRecord> = state
            .payments
            .values()
            .filter(|p| {
                p.receiver_id == lawyer && p.purpose == PaymentPurpose::LawyerBooking && p.success
            })
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(payments
            .into_iter()
            .filter_map(|p| {
                state.accounts.get(&p.sender_id).map(|a| LawyerClient {
                    id: a.id,
                    name: a.name.clone(),
                    email: a.email.clone(),
                    country: a.country.clone(),
                    amount_paid: p.amount,
                    payment_date: p.created_at,
                })
            })
            .collect())
    }

    async fn create_payment_record(
        &self,
        record: PaymentRecord,
    ) -> Result<PaymentRecord, RepoError> {
        let mut state = self.lock()?;
        if state.payments.contains_key(&record.gateway_payment_id) {
            return Err(RepoError::Conflict("Payment already exists".into()));
        }
        state
            .payments
            .insert(record.gateway_payment_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        Ok(self.lock()?.payments.get(gateway_payment_id).cloned())
    }

    async fn settle_payment(&self, record: PaymentRecord) -> Result<Settlement, RepoError> {
        let mut state = self.lock()?;

        if let Some(existing) = state.payments.get(&record.gateway_payment_id) {
            return Ok(Settlement {
                record: existing.clone(),
                replayed: true,
            });
        }

        if record.purpose == PaymentPurpose::Subscription {
            state
                .accounts
                .get_mut(&record.sender_id)
                .ok_or(RepoError::NotFound)?
                .tier = Tier::Premium;
        }

        state
            .payments
            .insert(record.gateway_payment_id.clone(), record.clone());

        Ok(Settlement {
            record,
            replayed: false,
        })
    }

    async fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, RepoError> {
        let mut state = self.lock()?;
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepoError> {
        Ok(self.lock()?.conversations.get(&id).cloned())
    }

    async fn list_conversations_for_account(
        &self,
        owner: AccountId,
    ) -> Result<Vec<Conversation>, RepoError> {
        let state = self.lock()?;
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }

    async fn count_turns(&self, conversation_id: ConversationId) -> Result<i64, RepoError> {
        let state = self.lock()?;
        Ok(state.turns.get(&conversation_id).map_or(0, |t| t.len() as i64))
    }

    async fn append_turn(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
    ) -> Result<Turn, RepoError> {
        let mut state = self.lock()?;
        if !state.conversations.contains_key(&conversation_id) {
            return Err(RepoError::NotFound);
        }
        Ok(state.push_turn(conversation_id, role, message))
    }

    async fn append_turn_within_cap(
        &self,
        conversation_id: ConversationId,
        role: TurnRole,
        message: &str,
        reserve: i64,
    ) -> Result<Turn, RepoError> {
        let mut state = self.lock()?;
        let conversation = state
            .conversations
            .get(&conversation_id)
            .ok_or(RepoError::NotFound)?;
        let turns = state.turns.get(&conversation_id).map_or(&[][..], Vec::as_slice);
        let user_turns = turns.iter().filter(|t| t.role == TurnRole::User).count() as i64;

        if !conversation.accepts_exchange(turns.len() as i64, user_turns, reserve) {
            return Err(RepoError::TurnCapReached {
                conversation_id,
                cap: conversation.turn_cap,
            });
        }
        Ok(state.push_turn(conversation_id, role, message))
    }

    async fn delete_turn(&self, id: TurnId) -> Result<bool, RepoError> {
        let mut state = self.lock()?;
        for turns in state.turns.values_mut() {
            if let Some(index) = turns.iter().position(|t| t.id == id) {
                turns.remove(index);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_turns(
        &self,
        conversation_id: ConversationId,
        limit: i64,
    ) -> Result<Vec<Turn>, RepoError> {
        let state = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(state
            .turns
            .get(&conversation_id)
            .map(|t| t.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
