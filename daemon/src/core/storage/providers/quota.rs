// Daily watch quota storage provider trait

use async_trait::async_trait;
use sika_common::{error::LedgerResult, ids::UserId, quota::DailyQuota, time::LedgerDay};

/// Storage provider for per-user, per-day watch counters.
#[async_trait]
pub trait QuotaProvider {
    /// Get the quota row for a user and day, None if the user has not
    /// watched anything that day
    async fn get_quota(&self, user: &UserId, day: LedgerDay) -> LedgerResult<Option<DailyQuota>>;

    /// Consume `by` slots from the day's quota, creating the row lazily
    /// with the given plan level and limit.
    ///
    /// The row keeps the limit it was created with for the whole day, a
    /// plan change does not move the cap until the next day.
    ///
    /// # Errors
    /// * `QuotaExceeded` - Consuming `by` slots would pass the limit
    async fn increment_quota(
        &self,
        user: &UserId,
        day: LedgerDay,
        by: u32,
        plan_level: u8,
        limit: u32,
    ) -> LedgerResult<DailyQuota>;

    /// Give back `by` slots after a credit that consumed them failed.
    /// Never errors on a missing row and never drops below zero.
    async fn rollback_quota(&self, user: &UserId, day: LedgerDay, by: u32) -> LedgerResult<()>;
}
