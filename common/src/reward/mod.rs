// Reward events
//
// A RewardEvent is written exactly once per idempotency key and never
// mutated or deleted afterwards; the set of stored events is the ledger's
// proof of what was credited and the guard against crediting it again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    ids::{InvestmentId, RewardId, UserId, VideoId},
    money::Amount,
    time::{LedgerDay, TimestampMillis},
};

/// What earned the reward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RewardSource {
    /// One watched video on one calendar day.
    VideoWatch { video_id: VideoId, day: LedgerDay },
    /// Referral bonus for a referred user's qualifying event.
    ReferralBonus {
        referred_user_id: UserId,
        event_id: String,
    },
}

/// One credited reward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardEvent {
    pub id: RewardId,

    /// Investment the amount was credited to
    pub investment_id: InvestmentId,

    /// User who earned it
    pub user_id: UserId,

    pub source: RewardSource,

    pub amount: Amount,

    /// Ledger day the credit counts towards. The day is computed from
    /// the configured UTC offset when the event is built, storage and
    /// stats take it as-is.
    pub day: LedgerDay,

    pub created_at: TimestampMillis,
}

impl RewardEvent {
    pub fn video_watch(
        id: RewardId,
        investment_id: InvestmentId,
        user_id: UserId,
        video_id: VideoId,
        day: LedgerDay,
        amount: Amount,
        now: TimestampMillis,
    ) -> Self {
        Self {
            id,
            investment_id,
            user_id,
            source: RewardSource::VideoWatch { video_id, day },
            amount,
            day,
            created_at: now,
        }
    }

    pub fn referral_bonus(
        id: RewardId,
        investment_id: InvestmentId,
        user_id: UserId,
        referred_user_id: UserId,
        event_id: String,
        amount: Amount,
        day: LedgerDay,
        now: TimestampMillis,
    ) -> Self {
        Self {
            id,
            investment_id,
            user_id,
            source: RewardSource::ReferralBonus {
                referred_user_id,
                event_id,
            },
            amount,
            day,
            created_at: now,
        }
    }

    /// The natural key this event occupies in the idempotency ledger.
    pub fn idempotency_key(&self) -> IdempotencyKey {
        match &self.source {
            RewardSource::VideoWatch { video_id, day } => IdempotencyKey::VideoWatch {
                user_id: self.user_id.clone(),
                video_id: video_id.clone(),
                day: *day,
            },
            RewardSource::ReferralBonus { event_id, .. } => IdempotencyKey::ReferralBonus {
                event_id: event_id.clone(),
            },
        }
    }
}

/// Natural uniqueness key of a credit.
///
/// A video watch is unique per (user, video, day): the same video replayed
/// on the same day must not credit twice, while tomorrow it may. A referral
/// bonus is unique per qualifying event, with no day dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum IdempotencyKey {
    VideoWatch {
        user_id: UserId,
        video_id: VideoId,
        day: LedgerDay,
    },
    ReferralBonus { event_id: String },
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoWatch {
                user_id,
                video_id,
                day,
            } => write!(f, "video-watch:{}:{}:{}", user_id, video_id, day.0),
            Self::ReferralBonus { event_id } => write!(f, "referral-bonus:{}", event_id),
        }
    }
}
