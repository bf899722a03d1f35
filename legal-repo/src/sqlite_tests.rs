//! SQLite store integration tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use legal_types::{
        Account, AccountKind, AccountStore, Conversation, ConversationId, Currency, LawyerProfile,
        Money, PaymentKind, PaymentPurpose, PaymentRecord, RepoError, TURN_CAP, Tier, Turn,
        TurnRole,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn account(name: &str, kind: AccountKind) -> Account {
        Account::new(
            name.to_string(),
            format!("{}@example.com", name.to_lowercase()),
            "India".to_string(),
            kind,
            "hash".to_string(),
        )
        .unwrap()
    }

    fn inr(amount: i64) -> Money {
        Money::new(amount, Currency::INR).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_find_account() {
        let repo = setup_repo().await;
        let created = repo
            .create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();

        let by_id = repo.find_account_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Asha");
        assert_eq!(by_id.tier, Tier::Free);
        assert_eq!(by_id.kind, AccountKind::Client);

        let by_email = repo
            .find_account_by_email("asha@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = setup_repo().await;
        repo.create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();

        let result = repo
            .create_account(account("Asha", AccountKind::Lawyer))
            .await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_tier_of_unknown_account() {
        let repo = setup_repo().await;
        let result = repo
            .update_account_tier(legal_types::AccountId::new(), Tier::Premium)
            .await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_account_keeps_tier() {
        let repo = setup_repo().await;
        let mut created = repo
            .create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();
        repo.update_account_tier(created.id, Tier::Premium)
            .await
            .unwrap();

        created.name = "Asha R".to_string();
        created.tier = Tier::Free;
        repo.update_account(&created).await.unwrap();

        let fetched = repo.find_account_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Asha R");
        assert_eq!(fetched.tier, Tier::Premium);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lawyers
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_available_lawyers_order_premium_first() {
        let repo = setup_repo().await;
        let now = Utc::now();

        let mut ids = Vec::new();
        for (name, hours_left) in [("Free", 5), ("Premium", 1), ("Later", 9)] {
            let lawyer = account(name, AccountKind::Lawyer);
            let profile = LawyerProfile {
                available_from: Some(now - Duration::hours(1)),
                available_to: Some(now + Duration::hours(hours_left)),
                ..LawyerProfile::empty(lawyer.id)
            };
            let (lawyer, _) = repo.create_lawyer(lawyer, profile).await.unwrap();
            ids.push(lawyer.id);
        }
        repo.update_account_tier(ids[1], Tier::Premium)
            .await
            .unwrap();

        // Outside of its window
        let away = account("Away", AccountKind::Lawyer);
        let profile = LawyerProfile {
            available_from: Some(now + Duration::hours(2)),
            available_to: Some(now + Duration::hours(3)),
            ..LawyerProfile::empty(away.id)
        };
        repo.create_lawyer(away, profile).await.unwrap();

        let listed: Vec<_> = repo
            .list_available_lawyers(now)
            .await
            .unwrap()
            .into_iter()
            .map(|(a, _)| a.id)
            .collect();

        assert_eq!(listed, vec![ids[1], ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn test_save_lawyer_profile_upserts() {
        let repo = setup_repo().await;
        let lawyer = account("Meera", AccountKind::Lawyer);
        let (lawyer, mut profile) = repo
            .create_lawyer(lawyer.clone(), LawyerProfile::empty(lawyer.id))
            .await
            .unwrap();

        profile.charge = Some(1500);
        profile.specialization = Some("Family law".to_string());
        repo.save_lawyer_profile(&profile).await.unwrap();

        let fetched = repo.find_lawyer_profile(lawyer.id).await.unwrap().unwrap();
        assert_eq!(fetched.charge, Some(1500));
        assert_eq!(fetched.specialization.as_deref(), Some("Family law"));
    }

    #[tokio::test]
    async fn test_lawyer_clients_come_from_bookings() {
        let repo = setup_repo().await;
        let lawyer = repo
            .create_account(account("Meera", AccountKind::Lawyer))
            .await
            .unwrap();
        let client = repo
            .create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();

        repo.settle_payment(PaymentRecord::settled(
            client.id,
            PaymentKind::Consultation { payee: lawyer.id },
            inr(150_000),
            "order_1".into(),
            "pay_1".into(),
        ))
        .await
        .unwrap();
        // A subscription is not a booking
        repo.settle_payment(PaymentRecord::settled(
            client.id,
            PaymentKind::Subscription,
            inr(29_900),
            "order_2".into(),
            "pay_2".into(),
        ))
        .await
        .unwrap();

        let clients = repo.list_lawyer_clients(lawyer.id).await.unwrap();

        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].id, client.id);
        assert_eq!(clients[0].amount_paid.amount(), 150_000);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_settle_subscription_upgrades_once() {
        let repo = setup_repo().await;
        let client = repo
            .create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();
        let record = PaymentRecord::settled(
            client.id,
            PaymentKind::Subscription,
            inr(29_900),
            "order_1".into(),
            "pay_1".into(),
        );

        let first = repo.settle_payment(record.clone()).await.unwrap();
        assert!(!first.replayed);

        let again = PaymentRecord::settled(
            client.id,
            PaymentKind::Subscription,
            inr(29_900),
            "order_1".into(),
            "pay_1".into(),
        );
        let second = repo.settle_payment(again).await.unwrap();
        assert!(second.replayed);
        assert_eq!(second.record.id, record.id);
        assert_eq!(second.record.purpose, PaymentPurpose::Subscription);

        let upgraded = repo.find_account_by_id(client.id).await.unwrap().unwrap();
        assert_eq!(upgraded.tier, Tier::Premium);
    }

    #[tokio::test]
    async fn test_settle_for_unknown_payer_leaves_no_record() {
        let repo = setup_repo().await;
        let ghost = account("Ghost", AccountKind::Client);
        let record = PaymentRecord::settled(
            ghost.id,
            PaymentKind::Subscription,
            inr(29_900),
            "order_1".into(),
            "pay_1".into(),
        );

        assert!(repo.settle_payment(record).await.is_err());
        assert!(
            repo.find_payment_by_gateway_id("pay_1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_payment_record_conflicts() {
        let repo = setup_repo().await;
        let client = repo
            .create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();
        let record = || {
            PaymentRecord::settled(
                client.id,
                PaymentKind::Subscription,
                inr(29_900),
                "order_1".into(),
                "pay_1".into(),
            )
        };

        repo.create_payment_record(record()).await.unwrap();
        let result = repo.create_payment_record(record()).await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversations
    // ─────────────────────────────────────────────────────────────────────────

    async fn conversation(repo: &SqliteRepo) -> Conversation {
        let owner = repo
            .create_account(account("Asha", AccountKind::Client))
            .await
            .unwrap();
        repo.create_conversation(Conversation::start(owner.id, "What is a lease?").unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_turns_are_ordered_by_position() {
        let repo = setup_repo().await;
        let conv = conversation(&repo).await;

        repo.append_turn(conv.id, TurnRole::User, "first")
            .await
            .unwrap();
        repo.append_turn(conv.id, TurnRole::Bot, "second")
            .await
            .unwrap();
        repo.append_turn(conv.id, TurnRole::User, "third")
            .await
            .unwrap();

        let turns = repo.list_turns(conv.id, TURN_CAP).await.unwrap();
        let messages: Vec<_> = turns.iter().map(|t| t.message.as_str()).collect();

        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(turns[2].position, 2);
        assert_eq!(turns[1].role, TurnRole::Bot);
    }

    #[tokio::test]
    async fn test_capped_append_reserves_reply_slot() {
        let repo = setup_repo().await;
        let conv = conversation(&repo).await;

        for _ in 0..TURN_CAP / 2 {
            repo.append_turn_within_cap(conv.id, TurnRole::User, "q", Turn::EXCHANGE_SIZE)
                .await
                .unwrap();
            repo.append_turn(conv.id, TurnRole::Bot, "a").await.unwrap();
        }

        let result = repo
            .append_turn_within_cap(conv.id, TurnRole::User, "one more", Turn::EXCHANGE_SIZE)
            .await;

        assert!(matches!(
            result,
            Err(RepoError::TurnCapReached { cap: TURN_CAP, .. })
        ));
        assert_eq!(repo.count_turns(conv.id).await.unwrap(), TURN_CAP);
    }

    #[tokio::test]
    async fn test_capped_append_counts_replies_still_owed() {
        let repo = setup_repo().await;
        let conv = conversation(&repo).await;

        for _ in 0..12 {
            repo.append_turn_within_cap(conv.id, TurnRole::User, "q", Turn::EXCHANGE_SIZE)
                .await
                .unwrap();
            repo.append_turn(conv.id, TurnRole::Bot, "a").await.unwrap();
        }

        // Five senders get their user turn in before any reply is written
        let mut accepted = 0;
        for i in 0..5 {
            let result = repo
                .append_turn_within_cap(conv.id, TurnRole::User, &format!("q{i}"), Turn::EXCHANGE_SIZE)
                .await;
            match result {
                Ok(_) => accepted += 1,
                Err(RepoError::TurnCapReached { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        for _ in 0..accepted {
            repo.append_turn(conv.id, TurnRole::Bot, "a").await.unwrap();
        }

        assert_eq!(accepted, 3);
        assert_eq!(repo.count_turns(conv.id).await.unwrap(), TURN_CAP);
    }

    #[tokio::test]
    async fn test_capped_append_to_unknown_conversation() {
        let repo = setup_repo().await;
        let result = repo
            .append_turn_within_cap(ConversationId::new(), TurnRole::User, "hi", 2)
            .await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_deleted_turn_frees_its_slot() {
        let repo = setup_repo().await;
        let conv = conversation(&repo).await;

        let first = repo
            .append_turn(conv.id, TurnRole::User, "kept")
            .await
            .unwrap();
        let second = repo
            .append_turn(conv.id, TurnRole::User, "rolled back")
            .await
            .unwrap();

        assert!(repo.delete_turn(second.id).await.unwrap());
        assert!(!repo.delete_turn(second.id).await.unwrap());
        assert_eq!(repo.count_turns(conv.id).await.unwrap(), 1);

        let next = repo
            .append_turn(conv.id, TurnRole::User, "retry")
            .await
            .unwrap();
        assert_eq!(next.position, first.position + 1);
    }

    #[tokio::test]
    async fn test_conversations_listed_for_owner_only() {
        let repo = setup_repo().await;
        let conv = conversation(&repo).await;
        let stranger = repo
            .create_account(account("Ravi", AccountKind::Client))
            .await
            .unwrap();

        let own = repo
            .list_conversations_for_account(conv.owner_id)
            .await
            .unwrap();
        let other = repo
            .list_conversations_for_account(stranger.id)
            .await
            .unwrap();

        assert_eq!(own.len(), 1);
        assert_eq!(own[0].title, "What is a lease?");
        assert!(other.is_empty());
    }
}
