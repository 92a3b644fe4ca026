// Wire types for the HTTP API
//
// Amounts cross the wire as decimal strings and every response body carries
// an explicit outcome tag, so clients distinguish "credited" from
// "already_credited" without inspecting status codes.

pub mod payout;

use serde::{Deserialize, Serialize};

use crate::{
    config::VERSION,
    ids::{InvestmentId, UserId, VideoId},
    investment::{Investment, InvestmentStatus},
    money::Amount,
    plan::PlanSpec,
    quota::DailyQuota,
    referral::ReferralBinding,
    reward::RewardEvent,
    time::TimestampMillis,
    withdrawal::{AccountDetails, WithdrawalRequest},
};

use self::payout::PayoutIntent;

/// Client-facing view of an investment, with the derived balance and the
/// plan name resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvestmentSummary {
    pub investment_id: InvestmentId,
    pub user_id: UserId,
    pub plan_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    pub amount_invested: Amount,
    pub total_earnings: Amount,
    pub available_earnings: Amount,
    pub status: InvestmentStatus,
    pub activated_at: TimestampMillis,
}

impl InvestmentSummary {
    pub fn new(investment: &Investment, plan: Option<&PlanSpec>) -> Self {
        Self {
            investment_id: investment.id,
            user_id: investment.user_id.clone(),
            plan_level: investment.plan_level,
            plan_name: plan.map(|p| p.name.clone()),
            amount_invested: investment.amount_invested,
            total_earnings: investment.total_earnings,
            available_earnings: investment.available_earnings(),
            status: investment.status,
            activated_at: investment.activated_at,
        }
    }
}

/// POST /accruals/video-watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditVideoWatchRequest {
    pub user_id: UserId,
    pub video_id: VideoId,
    pub investment_id: InvestmentId,
    /// Reward amount supplied by the video catalog
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CreditVideoWatchResponse {
    /// First credit for this (user, video, day)
    Credited {
        reward: RewardEvent,
        investment: InvestmentSummary,
    },
    /// Replay of an earlier credit; `reward` is the original event
    AlreadyCredited {
        reward: RewardEvent,
        investment: InvestmentSummary,
    },
}

/// POST /withdrawals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitWithdrawalRequest {
    pub investment_id: InvestmentId,
    pub amount: Amount,
    pub account_details: AccountDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub withdrawal: WithdrawalRequest,
    pub investment: InvestmentSummary,
}

/// Operator decision on a pending withdrawal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

/// POST /withdrawals/{id}/decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideWithdrawalRequest {
    pub decision: WithdrawalDecision,
    /// Operator note, recorded on rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideWithdrawalResponse {
    pub withdrawal: WithdrawalRequest,
    pub investment: InvestmentSummary,
    /// Present when the decision was an approval; forward it to the gateway
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout: Option<PayoutIntent>,
}

/// GET /users/{user}/daily-quota
///
/// Mirrors the daily stats panel the mobile app renders: all-zero fields
/// with `has_active_investment = false` mean the user cannot credit today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyStatsResponse {
    pub has_active_investment: bool,
    pub plan_level: u8,
    pub daily_limit: u32,
    pub videos_watched_today: u32,
    pub earnings_today: Amount,
    pub remaining_views: u32,
}

impl DailyStatsResponse {
    pub fn no_active_investment() -> Self {
        Self {
            has_active_investment: false,
            plan_level: 0,
            daily_limit: 0,
            videos_watched_today: 0,
            earnings_today: Amount::ZERO,
            remaining_views: 0,
        }
    }

    pub fn from_quota(quota: &DailyQuota, earnings_today: Amount) -> Self {
        Self {
            has_active_investment: true,
            plan_level: quota.plan_level_at_reset,
            daily_limit: quota.limit,
            videos_watched_today: quota.consumed,
            earnings_today,
            remaining_views: quota.remaining(),
        }
    }
}

/// GET /users/{user}/rewards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsResponse {
    pub rewards: Vec<RewardEvent>,
}

/// GET /users/{user}/investments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentsResponse {
    pub investments: Vec<InvestmentSummary>,
}

/// GET /investments/{id}/withdrawals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalsResponse {
    pub withdrawals: Vec<WithdrawalRequest>,
}

/// POST /investments/activations
///
/// Deposit confirmation event from the payment collaborator. Replayable:
/// the investment id is the event's natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateInvestmentRequest {
    pub investment_id: InvestmentId,
    pub user_id: UserId,
    pub plan_level: u8,
    pub amount_invested: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ActivateInvestmentResponse {
    Activated { investment: InvestmentSummary },
    AlreadyActivated { investment: InvestmentSummary },
}

/// POST /investments/{id}/status
///
/// Operator lifecycle transition driven by plan maturity tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetInvestmentStatusRequest {
    pub status: InvestmentStatus,
}

/// POST /referrals/bind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindReferrerRequest {
    pub user_id: UserId,
    pub referrer_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum BindReferrerResponse {
    Bound { binding: ReferralBinding },
    /// Same pair already bound; replay, not an error
    AlreadyBound { binding: ReferralBinding },
}

/// Error body returned for every taxonomy failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code, e.g. "quota_exceeded"
    pub code: String,
    pub message: String,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: VERSION.to_string(),
        }
    }
}
