// Daily quota counters
//
// One row per (user, day), created lazily on the first credit of the day.
// There is no reset job: yesterday's row simply stops being read when the
// day rolls over.

use serde::{Deserialize, Serialize};

use crate::{
    error::{LedgerError, LedgerResult},
    ids::UserId,
    time::LedgerDay,
};

/// Per-user, per-day video reward counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyQuota {
    pub user_id: UserId,

    pub day: LedgerDay,

    /// Plan level captured when this row was created. A plan change during
    /// the day does not move the cap until the next day.
    pub plan_level_at_reset: u8,

    /// Cap for the day, derived from the plan level at creation
    pub limit: u32,

    /// Videos credited so far, `0 <= consumed <= limit`
    pub consumed: u32,
}

impl DailyQuota {
    pub fn new(user_id: UserId, day: LedgerDay, plan_level: u8, limit: u32) -> Self {
        Self {
            user_id,
            day,
            plan_level_at_reset: plan_level,
            limit,
            consumed: 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.consumed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.consumed >= self.limit
    }

    /// Consume quota slots. Returns the new consumed count.
    pub fn increment(&mut self, by: u32) -> LedgerResult<u32> {
        let next = self.consumed.saturating_add(by);
        if next > self.limit {
            return Err(LedgerError::QuotaExceeded {
                limit: self.limit,
                day: self.day,
            });
        }
        self.consumed = next;
        Ok(next)
    }

    /// Give back slots taken by a credit that later failed.
    pub fn rollback(&mut self, by: u32) {
        self.consumed = self.consumed.saturating_sub(by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(limit: u32) -> DailyQuota {
        DailyQuota::new(UserId::from("user-1"), LedgerDay(20_000), 1, limit)
    }

    #[test]
    fn test_increment_to_limit() {
        let mut quota = quota(5);
        for expected in 1..=5 {
            assert_eq!(quota.increment(1).expect("test"), expected);
        }
        assert!(quota.is_exhausted());
        assert_eq!(quota.remaining(), 0);
    }

    #[test]
    fn test_increment_past_limit_fails() {
        let mut quota = quota(2);
        quota.increment(2).expect("test");
        let err = quota.increment(1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::QuotaExceeded {
                limit: 2,
                day: LedgerDay(20_000),
            }
        );
        // The failed increment consumed nothing
        assert_eq!(quota.consumed, 2);
    }

    #[test]
    fn test_rollback_returns_slots() {
        let mut quota = quota(3);
        quota.increment(1).expect("test");
        quota.rollback(1);
        assert_eq!(quota.consumed, 0);
        assert_eq!(quota.remaining(), 3);

        // Rollback never underflows
        quota.rollback(10);
        assert_eq!(quota.consumed, 0);
    }
}
