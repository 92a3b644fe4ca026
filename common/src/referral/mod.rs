// Referral bindings
//
// A user binds at most one referrer, once, before or at registration. The
// bonus itself is not tracked here: crediting goes through the reward
// idempotency ledger keyed on the referred user, so replays and races
// cannot pay a referrer twice.

use serde::{Deserialize, Serialize};

use crate::{
    config::{BPS_DENOMINATOR, DEFAULT_REFERRAL_BONUS_BPS},
    ids::UserId,
    time::TimestampMillis,
};

/// One referred-user to referrer relationship. Immutable after binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralBinding {
    /// The referred user
    pub user_id: UserId,

    pub referrer_id: UserId,

    pub bound_at: TimestampMillis,
}

impl ReferralBinding {
    pub fn new(user_id: UserId, referrer_id: UserId, now: TimestampMillis) -> Self {
        Self {
            user_id,
            referrer_id,
            bound_at: now,
        }
    }
}

/// Referral bonus policy (in basis points, 100 = 1%).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralConfig {
    /// Share of the referred user's first activated investment paid to the
    /// referrer. Values are in basis points (100 = 1%, 10000 = 100%)
    pub bonus_bps: u16,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            bonus_bps: DEFAULT_REFERRAL_BONUS_BPS,
        }
    }
}

impl ReferralConfig {
    /// Validate that the bonus does not exceed 100%
    pub fn is_valid(&self) -> bool {
        (self.bonus_bps as u64) <= BPS_DENOMINATOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReferralConfig::default();
        assert_eq!(config.bonus_bps, 500); // 5%
        assert!(config.is_valid());
    }

    #[test]
    fn test_bonus_over_hundred_percent_is_invalid() {
        let config = ReferralConfig { bonus_bps: 10_001 };
        assert!(!config.is_valid());
    }
}
