// Full ledger lifecycle: activation with a referral, a day of video
// rewards, then a withdrawal through approval and gateway settlement.
// Every collaborator event is also replayed where it matters.

use std::sync::Arc;

use sika_common::{
    api::{payout::PayoutCallback, WithdrawalDecision},
    error::LedgerError,
    ids::{Id, UserId, VideoId},
    money::Amount,
    withdrawal::{AccountDetails, WithdrawalStatus},
};
use sika_daemon::core::{
    ledger::{Ledger, LedgerConfig},
    storage::SledStorage,
};

fn momo() -> AccountDetails {
    AccountDetails {
        provider: "MTN".to_string(),
        phone_number: "0244000000".to_string(),
        account_name: "Ama Mensah".to_string(),
    }
}

#[tokio::test]
async fn test_full_ledger_lifecycle() {
    let storage = Arc::new(SledStorage::temporary().expect("temporary database"));
    let ledger = Arc::new(Ledger::new(storage, LedgerConfig::default()));

    // Rita invested earlier and referred Ama
    let rita_investment = Id::random();
    ledger
        .activate_investment(&rita_investment, &UserId::from("rita"), 1, Amount::from_whole(50))
        .await
        .unwrap();
    ledger
        .bind_referrer(&UserId::from("ama"), &UserId::from("rita"))
        .await
        .unwrap();

    // Ama's deposit confirms; rita earns 5% of 200.00
    let ama = UserId::from("ama");
    let ama_investment = Id::random();
    let outcome = ledger
        .activate_investment(&ama_investment, &ama, 2, Amount::from_whole(200))
        .await
        .unwrap();
    assert!(!outcome.is_replay());

    let rita_balance = ledger.get_investment(&rita_investment).await.unwrap();
    assert_eq!(rita_balance.total_earnings, Amount::from_whole(10));

    // The payment collaborator redelivers; nothing changes
    let replay = ledger
        .activate_investment(&ama_investment, &ama, 2, Amount::from_whole(200))
        .await
        .unwrap();
    assert!(replay.is_replay());
    let rita_balance = ledger.get_investment(&rita_investment).await.unwrap();
    assert_eq!(rita_balance.total_earnings, Amount::from_whole(10));

    // Ama watches her plan's daily cap of 10 videos at 1.50 each
    for i in 0..10 {
        let result = ledger
            .credit_video_watch(
                &ama,
                &VideoId::new(format!("video-{}", i)),
                &ama_investment,
                "1.50".parse().unwrap(),
            )
            .await
            .unwrap();
        assert!(!result.is_replay());
    }
    let err = ledger
        .credit_video_watch(&ama, &VideoId::from("video-extra"), &ama_investment, "1.50".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::QuotaExceeded { limit: 10, .. }));

    // A duplicate of an already-credited watch changes nothing
    let duplicate = ledger
        .credit_video_watch(&ama, &VideoId::from("video-3"), &ama_investment, "1.50".parse().unwrap())
        .await
        .unwrap();
    assert!(duplicate.is_replay());

    let investment = ledger.get_investment(&ama_investment).await.unwrap();
    assert_eq!(investment.total_earnings, Amount::from_whole(15));

    let stats = ledger.daily_stats(&ama).await.unwrap();
    assert_eq!(stats.videos_watched_today, 10);
    assert_eq!(stats.remaining_views, 0);
    assert_eq!(stats.earnings_today, Amount::from_whole(15));

    // Ama withdraws 12.00 of her 15.00
    let (withdrawal, investment) = ledger
        .submit_withdrawal(&ama_investment, Amount::from_whole(12), momo())
        .await
        .unwrap();
    assert_eq!(investment.available_earnings(), Amount::from_whole(3));

    let decision = ledger
        .decide_withdrawal(&withdrawal.id, WithdrawalDecision::Approve, None)
        .await
        .unwrap();
    let payout = decision.payout.expect("approval must emit a payout intent");
    assert_eq!(payout.amount, Amount::from_whole(12));

    // The gateway pays and calls back, twice
    let callback = PayoutCallback::success(withdrawal.id, "momo-tx-778".to_string());
    let (settled, investment) = ledger.apply_payout_callback(&callback).await.unwrap();
    assert_eq!(settled.status, WithdrawalStatus::Settled);
    assert_eq!(investment.withdrawn_total, Amount::from_whole(12));

    let (_, investment) = ledger.apply_payout_callback(&callback).await.unwrap();
    assert_eq!(investment.withdrawn_total, Amount::from_whole(12));
    assert_eq!(investment.available_earnings(), Amount::from_whole(3));

    // Lifetime earnings were never reduced by the payout
    assert_eq!(investment.total_earnings, Amount::from_whole(15));
}
