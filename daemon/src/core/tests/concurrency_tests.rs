// Concurrency Tests
// Racing duplicates and competing debits must resolve to exactly one
// winner; the per-entity write locks do the serializing

#[cfg(test)]
mod concurrency_tests {
    use std::sync::Arc;

    use sika_common::{
        api::WithdrawalDecision,
        error::LedgerError,
        ids::{UserId, VideoId},
        money::Amount,
    };

    use crate::core::tests::support;

    // Test 1: The same watch delivered by many clients at once credits once
    #[tokio::test]
    async fn test_concurrent_duplicate_watches_credit_once() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;

        let mut handles = vec![];
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .credit_video_watch(
                        &UserId::from("alice"),
                        &VideoId::from("video-1"),
                        &investment_id,
                        Amount::from_whole(2),
                    )
                    .await
            }));
        }

        let mut applied = 0;
        let mut replayed = 0;
        let mut denied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(result) if result.is_replay() => replayed += 1,
                Ok(_) => applied += 1,
                // A duplicate that outran the fast path can lose the
                // slot race before reaching the keyed insert
                Err(LedgerError::QuotaExceeded { .. }) => denied += 1,
                Err(err) => panic!("unexpected error: {}", err),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(applied + replayed + denied, 20);

        let investment = ledger.get_investment(&investment_id).await.unwrap();
        assert_eq!(investment.total_earnings, Amount::from_whole(2));

        // Losing duplicates refunded their quota slots
        let stats = ledger.daily_stats(&UserId::from("alice")).await.unwrap();
        assert_eq!(stats.videos_watched_today, 1);
    }

    // Test 2: More distinct videos than the cap, exactly the cap credits
    #[tokio::test]
    async fn test_concurrent_watches_respect_quota() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;

        let mut handles = vec![];
        for i in 0..10 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .credit_video_watch(
                        &UserId::from("alice"),
                        &VideoId::new(format!("video-{}", i)),
                        &investment_id,
                        Amount::from_whole(2),
                    )
                    .await
            }));
        }

        let mut credited = 0;
        let mut denied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(result) => {
                    assert!(!result.is_replay());
                    credited += 1;
                }
                Err(LedgerError::QuotaExceeded { limit: 5, .. }) => denied += 1,
                Err(err) => panic!("unexpected error: {}", err),
            }
        }
        assert_eq!(credited, 5);
        assert_eq!(denied, 5);

        let investment = ledger.get_investment(&investment_id).await.unwrap();
        assert_eq!(investment.total_earnings, Amount::from_whole(10));
    }

    // Test 3: Competing withdrawals cannot hold more than is available
    #[tokio::test]
    async fn test_concurrent_withdrawals_cannot_overdraw() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;

        let mut handles = vec![];
        for _ in 0..4 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
                    .await
            }));
        }

        let mut submitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => submitted += 1,
                Err(LedgerError::InsufficientBalance { .. }) => {}
                Err(err) => panic!("unexpected error: {}", err),
            }
        }
        // 60 fits into 100 exactly once
        assert_eq!(submitted, 1);

        let investment = ledger.get_investment(&investment_id).await.unwrap();
        assert_eq!(investment.reserved_total, Amount::from_whole(60));
        assert_eq!(investment.available_earnings(), Amount::from_whole(40));
    }

    // Test 4: Racing decisions on one request, one operator wins
    #[tokio::test]
    async fn test_concurrent_decisions_apply_once() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            let id = withdrawal.id;
            handles.push(tokio::spawn(async move {
                ledger
                    .decide_withdrawal(&id, WithdrawalDecision::Approve, None)
                    .await
            }));
        }

        let mut decided = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => {
                    assert!(outcome.payout.is_some());
                    decided += 1;
                }
                Err(LedgerError::InvalidTransition { .. }) => {}
                Err(err) => panic!("unexpected error: {}", err),
            }
        }
        assert_eq!(decided, 1);
    }

    // Test 5: The idempotency key is per user, one video credits everyone
    #[tokio::test]
    async fn test_same_video_across_users_credits_each() {
        let ledger = support::ledger();
        let mut handles = vec![];
        for i in 0..8 {
            let user = format!("user-{}", i);
            let investment_id = support::active_investment(&ledger, &user).await;
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger
                    .credit_video_watch(
                        &UserId::new(user),
                        &VideoId::from("shared-video"),
                        &investment_id,
                        Amount::from_whole(2),
                    )
                    .await
            }));
        }

        // Same video, different users: every credit stands on its own key
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert!(!result.is_replay());
        }
    }
}
