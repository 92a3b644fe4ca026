use async_trait::async_trait;
use log::trace;
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::UserId,
    quota::DailyQuota,
    time::LedgerDay,
};

use crate::core::storage::{sled::LockKey, QuotaProvider, SledStorage};

#[async_trait]
impl QuotaProvider for SledStorage {
    async fn get_quota(&self, user: &UserId, day: LedgerDay) -> LedgerResult<Option<DailyQuota>> {
        trace!("get quota for user {} on {}", user, day);
        Self::load_optional(&self.quotas, &Self::user_day_key(user, day))
    }

    async fn increment_quota(
        &self,
        user: &UserId,
        day: LedgerDay,
        by: u32,
        plan_level: u8,
        limit: u32,
    ) -> LedgerResult<DailyQuota> {
        let _guard = self.guard(LockKey::Quota(user.clone(), day)).await;

        let key = Self::user_day_key(user, day);
        let mut quota: DailyQuota = Self::load_optional(&self.quotas, &key)?
            .unwrap_or_else(|| DailyQuota::new(user.clone(), day, plan_level, limit));

        quota.increment(by)?;
        trace!(
            "quota for user {} on {} now {}/{}",
            user,
            day,
            quota.consumed,
            quota.limit
        );

        self.quotas
            .insert(key, Self::encode(&quota)?)
            .map_err(LedgerError::storage)?;
        Ok(quota)
    }

    async fn rollback_quota(&self, user: &UserId, day: LedgerDay, by: u32) -> LedgerResult<()> {
        let _guard = self.guard(LockKey::Quota(user.clone(), day)).await;

        let key = Self::user_day_key(user, day);
        let Some(mut quota) = Self::load_optional::<DailyQuota>(&self.quotas, &key)? else {
            return Ok(());
        };

        quota.rollback(by);
        trace!(
            "quota rollback for user {} on {}, now {}/{}",
            user,
            day,
            quota.consumed,
            quota.limit
        );

        self.quotas
            .insert(key, Self::encode(&quota)?)
            .map_err(LedgerError::storage)?;
        Ok(())
    }
}
