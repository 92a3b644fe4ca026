// Reward event storage provider trait

use async_trait::async_trait;
use sika_common::{
    error::LedgerResult,
    ids::{InvestmentId, UserId},
    investment::Investment,
    money::Amount,
    reward::{IdempotencyKey, RewardEvent},
    time::LedgerDay,
};

/// Result of pushing a reward event through the idempotency gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditResult {
    /// The event was new, earnings were credited.
    Applied {
        investment: Investment,
        reward: RewardEvent,
    },
    /// An event with the same idempotency key already exists. Nothing
    /// was written, the original event and the current investment state
    /// are returned.
    AlreadyApplied {
        investment: Investment,
        reward: RewardEvent,
    },
}

impl CreditResult {
    pub fn investment(&self) -> &Investment {
        match self {
            Self::Applied { investment, .. } | Self::AlreadyApplied { investment, .. } => {
                investment
            }
        }
    }

    pub fn reward(&self) -> &RewardEvent {
        match self {
            Self::Applied { reward, .. } | Self::AlreadyApplied { reward, .. } => reward,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::AlreadyApplied { .. })
    }
}

/// Storage provider for reward events and the earnings they credit.
#[async_trait]
pub trait RewardProvider {
    /// Credit earnings to an investment, gated by the event's
    /// idempotency key.
    ///
    /// The event insert and the balance update are one atomic write:
    /// either both land on disk or neither does. Replaying a key never
    /// credits twice.
    ///
    /// # Errors
    /// * `InvestmentNotFound` - Target investment does not exist
    /// * `InvestmentNotActive` - Target investment is matured or closed
    /// * `BalanceOverflow` - Credit would overflow the lifetime total
    async fn credit_earnings(
        &self,
        investment_id: &InvestmentId,
        event: RewardEvent,
    ) -> LedgerResult<CreditResult>;

    /// Look up a reward event by its idempotency key
    async fn get_reward(&self, key: &IdempotencyKey) -> LedgerResult<Option<RewardEvent>>;

    /// All reward events for a user, oldest first
    async fn get_rewards_by_user(&self, user: &UserId) -> LedgerResult<Vec<RewardEvent>>;

    /// Reward events for a user on one ledger day
    async fn get_rewards_for_day(
        &self,
        user: &UserId,
        day: LedgerDay,
    ) -> LedgerResult<Vec<RewardEvent>>;

    /// Sum of reward amounts for a user on one ledger day
    async fn sum_rewards_for_day(&self, user: &UserId, day: LedgerDay) -> LedgerResult<Amount>;
}
