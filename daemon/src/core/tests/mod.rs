// Test modules for the ledger core

#[cfg(test)]
mod accrual_tests;


#[cfg(test)]
mod concurrency_tests;




#[cfg(test)]
mod withdrawal_tests;

#[cfg(test)]
pub(crate) mod support {
    use std::sync::Arc;

    use sika_common::{
        ids::{Id, InvestmentId, UserId, VideoId},
        money::Amount,
        reward::RewardEvent,
        time::get_current_time_in_millis,
        withdrawal::AccountDetails,
    };

    use crate::core::{
        ledger::{Ledger, LedgerConfig},
        storage::{RewardProvider, SledStorage},
    };

    /// Ledger over a throwaway in-memory database.
    pub fn ledger() -> Arc<Ledger<SledStorage>> {
        ledger_with(LedgerConfig::default())
    }

    pub fn ledger_with(config: LedgerConfig) -> Arc<Ledger<SledStorage>> {
        let storage = SledStorage::temporary().expect("temporary sled database");
        Arc::new(Ledger::new(Arc::new(storage), config))
    }

    /// Activate a fresh plan-1 investment funded with 100.00 for `user`.
    pub async fn active_investment(ledger: &Ledger<SledStorage>, user: &str) -> InvestmentId {
        let id = Id::random();
        ledger
            .activate_investment(&id, &UserId::from(user), 1, Amount::from_whole(100))
            .await
            .expect("activation");
        id
    }

    /// Credit earnings straight through storage, sidestepping the daily
    /// quota so tests can build whatever balance they need.
    pub async fn fund(
        ledger: &Ledger<SledStorage>,
        investment_id: &InvestmentId,
        user: &str,
        amount: Amount,
    ) {
        let event = RewardEvent::video_watch(
            Id::random(),
            *investment_id,
            UserId::from(user),
            VideoId::new(Id::random().to_string()),
            ledger.today(),
            amount,
            get_current_time_in_millis(),
        );
        ledger
            .storage()
            .credit_earnings(investment_id, event)
            .await
            .expect("funding credit");
    }

    pub fn momo() -> AccountDetails {
        AccountDetails {
            provider: "MTN".to_string(),
            phone_number: "0244000000".to_string(),
            account_name: "Ama Mensah".to_string(),
        }
    }
}
