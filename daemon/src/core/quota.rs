// Daily quota policy
//
// Thin policy layer over the quota rows: derives the cap from the plan
// schedule, derives the ledger day from the configured UTC offset, and
// hands both to storage. Holds no state of its own, so it clones freely
// into the engines that consume slots.

use std::sync::Arc;

use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::UserId,
    quota::DailyQuota,
    time::LedgerDay,
};

use super::{ledger::LedgerConfig, storage::LedgerStorage};

pub struct QuotaTracker<S: LedgerStorage> {
    storage: Arc<S>,
    config: Arc<LedgerConfig>,
}

impl<S: LedgerStorage> Clone for QuotaTracker<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: LedgerStorage> QuotaTracker<S> {
    pub fn new(storage: Arc<S>, config: Arc<LedgerConfig>) -> Self {
        Self { storage, config }
    }

    /// Current ledger day under the configured UTC offset.
    pub fn today(&self) -> LedgerDay {
        LedgerDay::today(self.config.utc_offset_minutes)
    }

    /// Take one video slot out of the user's quota for `day`.
    ///
    /// The row is created lazily with the cap the plan schedule gives
    /// for `plan_level` and keeps that cap for the whole day.
    ///
    /// # Errors
    /// * `UnknownPlanLevel` - The schedule has no tier for this level
    /// * `QuotaExceeded` - The day's cap is already reached
    pub async fn consume_slot(
        &self,
        user: &UserId,
        plan_level: u8,
        day: LedgerDay,
    ) -> LedgerResult<DailyQuota> {
        let limit = self
            .config
            .schedule
            .daily_limit(plan_level)
            .ok_or(LedgerError::UnknownPlanLevel(plan_level))?;
        self.storage
            .increment_quota(user, day, 1, plan_level, limit)
            .await
    }

    /// Hand back a slot taken by a credit that did not happen.
    pub async fn give_back_slot(&self, user: &UserId, day: LedgerDay) -> LedgerResult<()> {
        self.storage.rollback_quota(user, day, 1).await
    }

    /// Today's quota row, None if the user has not credited anything yet.
    pub async fn current(&self, user: &UserId) -> LedgerResult<Option<DailyQuota>> {
        self.storage.get_quota(user, self.today()).await
    }
}
