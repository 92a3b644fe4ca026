// Withdrawal Tests
// Submit, decide and settle: the hold must move exactly once, either
// into a permanent debit or back to available earnings

#[cfg(test)]
mod withdrawal_tests {
    use sika_common::{
        api::{payout::PayoutCallback, WithdrawalDecision},
        error::LedgerError,
        ids::Id,
        money::Amount,
        withdrawal::WithdrawalStatus,
    };

    use crate::core::tests::support;

    #[tokio::test]
    async fn test_submit_holds_funds_without_debiting() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;

        let (withdrawal, investment) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();

        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(withdrawal.amount, Amount::from_whole(60));
        // Held, not spent
        assert_eq!(investment.total_earnings, Amount::from_whole(100));
        assert_eq!(investment.reserved_total, Amount::from_whole(60));
        assert_eq!(investment.withdrawn_total, Amount::ZERO);
        assert_eq!(investment.available_earnings(), Amount::from_whole(40));
    }

    #[tokio::test]
    async fn test_submit_beyond_available_is_rejected() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(50)).await;

        let err = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(51), support::momo())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                requested: Amount::from_whole(51),
                available: Amount::from_whole(50),
            }
        );

        // Nothing was held
        let investment = ledger.get_investment(&investment_id).await.unwrap();
        assert_eq!(investment.reserved_total, Amount::ZERO);
        assert!(ledger
            .get_investment_withdrawals(&investment_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_sees_reduced_balance() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;

        ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(70), support::momo())
            .await
            .unwrap();

        let err = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(40), support::momo())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                requested: Amount::from_whole(40),
                available: Amount::from_whole(30),
            }
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_zero_and_blank_details() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;

        let err = ledger
            .submit_withdrawal(&investment_id, Amount::ZERO, support::momo())
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NonPositiveAmount);

        let mut details = support::momo();
        details.phone_number = "   ".to_string();
        let err = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(10), details)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountDetails(_)));
    }

    #[tokio::test]
    async fn test_approve_emits_payout_and_keeps_hold() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();

        let outcome = ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();

        assert_eq!(outcome.withdrawal.status, WithdrawalStatus::Approved);
        let payout = outcome.payout.unwrap();
        assert_eq!(payout.withdrawal_id, withdrawal.id);
        assert_eq!(payout.amount, Amount::from_whole(60));
        // The money is still only held until the gateway answers
        assert_eq!(outcome.investment.reserved_total, Amount::from_whole(60));
        assert_eq!(outcome.investment.withdrawn_total, Amount::ZERO);
    }

    #[tokio::test]
    async fn test_reject_releases_hold() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();

        let outcome = ledger
            .decide_withdrawal(
                &withdrawal.id,
                WithdrawalDecision::Reject,
                Some("suspicious account".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(outcome.withdrawal.status, WithdrawalStatus::Rejected);
        assert_eq!(
            outcome.withdrawal.reject_reason.as_deref(),
            Some("suspicious account")
        );
        assert!(outcome.payout.is_none());
        assert_eq!(outcome.investment.reserved_total, Amount::ZERO);
        assert_eq!(outcome.investment.available_earnings(), Amount::from_whole(100));
    }

    #[tokio::test]
    async fn test_second_decision_loses() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();

        ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();
        let err = ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_reject_after_approve_cancels_payout() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();
        ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();

        // Approved requests can still fail; the hold goes back
        let outcome = ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Reject, None)
            .await
            .unwrap();
        assert_eq!(outcome.withdrawal.status, WithdrawalStatus::Rejected);
        assert_eq!(outcome.investment.available_earnings(), Amount::from_whole(100));
    }

    #[tokio::test]
    async fn test_success_callback_settles() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();
        ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();

        let callback = PayoutCallback::success(withdrawal.id, "momo-tx-991".to_string());
        let (settled, investment) = ledger.apply_payout_callback(&callback).await.unwrap();

        assert_eq!(settled.status, WithdrawalStatus::Settled);
        // The hold became a permanent debit; lifetime earnings stay put
        assert_eq!(investment.total_earnings, Amount::from_whole(100));
        assert_eq!(investment.withdrawn_total, Amount::from_whole(60));
        assert_eq!(investment.reserved_total, Amount::ZERO);
        assert_eq!(investment.available_earnings(), Amount::from_whole(40));
    }

    #[tokio::test]
    async fn test_failure_callback_releases_hold() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();
        ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();

        let callback = PayoutCallback::failure(withdrawal.id, "insufficient float".to_string());
        let (rejected, investment) = ledger.apply_payout_callback(&callback).await.unwrap();

        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(rejected.reject_reason.as_deref(), Some("insufficient float"));
        assert_eq!(investment.withdrawn_total, Amount::ZERO);
        assert_eq!(investment.available_earnings(), Amount::from_whole(100));
    }

    #[tokio::test]
    async fn test_replayed_success_callback_is_harmless() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();
        ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();

        let callback = PayoutCallback::success(withdrawal.id, "momo-tx-991".to_string());
        ledger.apply_payout_callback(&callback).await.unwrap();
        // The gateway retries; the debit must not double
        let (settled, investment) = ledger.apply_payout_callback(&callback).await.unwrap();

        assert_eq!(settled.status, WithdrawalStatus::Settled);
        assert_eq!(investment.withdrawn_total, Amount::from_whole(60));
        assert_eq!(investment.available_earnings(), Amount::from_whole(40));
    }

    #[tokio::test]
    async fn test_contradicting_callback_is_rejected() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();
        ledger
            .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
            .await
            .unwrap();
        let success = PayoutCallback::success(withdrawal.id, "momo-tx-991".to_string());
        ledger.apply_payout_callback(&success).await.unwrap();

        let failure = PayoutCallback::failure(withdrawal.id, "late failure".to_string());
        let err = ledger.apply_payout_callback(&failure).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: WithdrawalStatus::Settled,
                to: WithdrawalStatus::Rejected,
                ..
            }
        ));

        // The settled debit is untouched
        let investment = ledger.get_investment(&investment_id).await.unwrap();
        assert_eq!(investment.withdrawn_total, Amount::from_whole(60));
    }

    #[tokio::test]
    async fn test_callback_on_pending_request_is_rejected() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;
        let (withdrawal, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(60), support::momo())
            .await
            .unwrap();

        // The gateway can only answer for payouts it was handed, and
        // nothing was approved yet
        let callback = PayoutCallback::success(withdrawal.id, "momo-tx-991".to_string());
        let err = ledger.apply_payout_callback(&callback).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: WithdrawalStatus::Pending,
                to: WithdrawalStatus::Settled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_withdrawal_ids() {
        let ledger = support::ledger();
        let id = Id::random();

        let err = ledger
            .decide_withdrawal(&id, WithdrawalDecision::Approve, None)
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::WithdrawalNotFound(id));

        let err = ledger.get_withdrawal(&id).await.unwrap_err();
        assert_eq!(err, LedgerError::WithdrawalNotFound(id));
    }

    #[tokio::test]
    async fn test_withdrawal_history_per_investment() {
        let ledger = support::ledger();
        let investment_id = support::active_investment(&ledger, "alice").await;
        support::fund(&ledger, &investment_id, "alice", Amount::from_whole(100)).await;

        let (first, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(30), support::momo())
            .await
            .unwrap();
        let (second, _) = ledger
            .submit_withdrawal(&investment_id, Amount::from_whole(20), support::momo())
            .await
            .unwrap();

        let history = ledger.get_investment_withdrawals(&investment_id).await.unwrap();
        assert_eq!(history.len(), 2);
        let ids: Vec<_> = history.iter().map(|w| w.id).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
    }
}
