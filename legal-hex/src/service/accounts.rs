//! Account Application Service
//!
//! Registration, login and profile management for clients and lawyers.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use legal_repo::security::{hash_password, verify_password};
use legal_types::domain::account::normalize_email;
use legal_types::{
    Account, AccountId, AccountKind, AccountResponse, AccountStore, AppError, ClientsResponse,
    ConversationResponse, LawyerClientResponse, LawyerProfile, LawyerProfileResponse,
    LawyerResponse, LoginRequest, ProfileResponse, RegisterClientRequest, RegisterLawyerRequest,
    TURN_CAP, UpdateLawyerRequest,
};

use super::require_fields;

#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

/// Application service for account operations.
pub struct AccountService<R: AccountStore> {
    repo: Arc<R>,
    settings: AccountSettings,
}

impl<R: AccountStore> AccountService<R> {
    pub fn new(repo: Arc<R>, settings: AccountSettings) -> Self {
        Self { repo, settings }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Registration & Login
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn register_client(
        &self,
        req: RegisterClientRequest,
    ) -> Result<AccountResponse, AppError> {
        require_fields(&[
            ("name", &req.name),
            ("email", &req.email),
            ("password", &req.password),
            ("country", &req.country),
        ])?;

        let password_hash = self.hash(req.password).await?;
        let account = Account::new(
            req.name,
            req.email,
            req.country,
            AccountKind::Client,
            password_hash,
        )?;
        let account = self.repo.create_account(account).await?;

        tracing::info!(account_id = %account.id, "Client registered");
        Ok(AccountResponse::from(&account))
    }

    pub async fn register_lawyer(
        &self,
        req: RegisterLawyerRequest,
    ) -> Result<LawyerResponse, AppError> {
        require_fields(&[
            ("name", &req.name),
            ("email", &req.email),
            ("password", &req.password),
            ("country", &req.country),
        ])?;
        validate_profile(req.charge, req.available_from, req.available_to)?;

        let password_hash = self.hash(req.password).await?;
        let account = Account::new(
            req.name,
            req.email,
            req.country,
            AccountKind::Lawyer,
            password_hash,
        )?;
        let profile = LawyerProfile {
            phone: non_blank(req.phone),
            specialization: non_blank(req.specialization),
            charge: req.charge,
            available_from: req.available_from,
            available_to: req.available_to,
            ..LawyerProfile::empty(account.id)
        };

        let (account, profile) = self.repo.create_lawyer(account, profile).await?;

        tracing::info!(account_id = %account.id, "Lawyer registered");
        Ok(LawyerResponse::new(&account, &profile))
    }

    /// Checks credentials for an account of the given kind.
    ///
    /// Unknown email, wrong kind and wrong password are indistinguishable.
    pub async fn login(&self, kind: AccountKind, req: LoginRequest) -> Result<Account, AppError> {
        require_fields(&[("email", &req.email), ("password", &req.password)])?;

        let invalid = || AppError::Unauthorized("Invalid credentials".into());

        let account = self
            .repo
            .find_account_by_email(&normalize_email(&req.email))
            .await?
            .filter(|account| account.kind == kind)
            .ok_or_else(invalid)?;

        let stored_hash = account.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || verify_password(&req.password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;

        if !matches {
            tracing::warn!(account_id = %account.id, "Login rejected");
            return Err(invalid());
        }

        Ok(account)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Profiles
    // ─────────────────────────────────────────────────────────────────────────────

    /// Account details with the full conversation history.
    pub async fn profile(&self, id: AccountId) -> Result<ProfileResponse, AppError> {
        let account = self.account(id).await?;

        let lawyer = if account.is_lawyer() {
            self.repo
                .find_lawyer_profile(id)
                .await?
                .as_ref()
                .map(LawyerProfileResponse::from)
        } else {
            None
        };

        let mut conversations = Vec::new();
        for conversation in self.repo.list_conversations_for_account(id).await? {
            let turns = self.repo.list_turns(conversation.id, TURN_CAP).await?;
            conversations.push(ConversationResponse::new(&conversation, &turns));
        }

        Ok(ProfileResponse {
            profile: AccountResponse::from(&account),
            lawyer,
            conversations,
        })
    }

    /// Applies the fields present in `patch` to a lawyer's account and profile.
    pub async fn update_lawyer(
        &self,
        id: AccountId,
        patch: UpdateLawyerRequest,
    ) -> Result<LawyerResponse, AppError> {
        let mut account = self.account(id).await?;
        if !account.is_lawyer() {
            return Err(AppError::Forbidden("Only lawyers have a lawyer profile".into()));
        }

        let mut profile = self
            .repo
            .find_lawyer_profile(id)
            .await?
            .unwrap_or_else(|| LawyerProfile::empty(id));

        if let Some(name) = non_blank(patch.name) {
            account.name = name;
        }
        if let Some(country) = non_blank(patch.country) {
            account.country = country;
        }
        if let Some(password) = non_blank(patch.password) {
            account.password_hash = self.hash(password).await?;
        }

        if patch.phone.is_some() {
            profile.phone = non_blank(patch.phone);
        }
        if patch.specialization.is_some() {
            profile.specialization = non_blank(patch.specialization);
        }
        profile.charge = patch.charge.or(profile.charge);
        profile.available_from = patch.available_from.or(profile.available_from);
        profile.available_to = patch.available_to.or(profile.available_to);
        validate_profile(profile.charge, profile.available_from, profile.available_to)?;

        self.repo.update_account(&account).await?;
        self.repo.save_lawyer_profile(&profile).await?;

        tracing::info!(account_id = %id, "Lawyer profile updated");
        Ok(LawyerResponse::new(&account, &profile))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lawyer Discovery
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lawyers available at `now`, PREMIUM first.
    pub async fn available_lawyers(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<LawyerResponse>, AppError> {
        Ok(self
            .repo
            .list_available_lawyers(now)
            .await?
            .iter()
            .map(|(account, profile)| LawyerResponse::new(account, profile))
            .collect())
    }

    /// Clients who booked the lawyer `id`, newest payment first.
    pub async fn lawyer_clients(&self, id: AccountId) -> Result<ClientsResponse, AppError> {
        let clients = self.repo.list_lawyer_clients(id).await?;
        Ok(ClientsResponse {
            success: true,
            clients: clients.iter().map(LawyerClientResponse::from).collect(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    async fn hash(&self, password: String) -> Result<String, AppError> {
        let cost = self.settings.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&password, cost))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn validate_profile(
    charge: Option<i64>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if charge.is_some_and(|c| c < 0) {
        return Err(AppError::BadRequest("Charge cannot be negative".into()));
    }
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest(
                "availableFrom must not be after availableTo".into(),
            ));
        }
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_inverted_window_rejected() {
        let now = Utc::now();
        let result = validate_profile(None, Some(now), Some(now - Duration::hours(1)));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_negative_charge_rejected() {
        assert!(validate_profile(Some(-1), None, None).is_err());
        assert!(validate_profile(Some(0), None, None).is_ok());
    }

    #[test]
    fn test_non_blank_trims() {
        assert_eq!(non_blank(Some("  Tax law ".into())).as_deref(), Some("Tax law"));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
