// Ledger façade
//
// One object owning the storage backend and the engines, shared behind
// an Arc between the HTTP layer and the expiry sweep. The engines stay
// private; callers only see the façade's operations.

use std::sync::Arc;
use std::time::Duration;

use sika_common::{
    api::{payout::PayoutCallback, DailyStatsResponse, InvestmentSummary, WithdrawalDecision},
    config::{DEFAULT_UTC_OFFSET_MINUTES, DEFAULT_WITHDRAWAL_EXPIRY_SECS},
    error::LedgerResult,
    ids::{InvestmentId, UserId, VideoId, WithdrawalId},
    investment::{Investment, InvestmentStatus},
    money::Amount,
    plan::PlanSchedule,
    referral::ReferralConfig,
    reward::RewardEvent,
    time::LedgerDay,
    withdrawal::{AccountDetails, WithdrawalRequest},
};

use super::{
    accrual::AccrualEngine,
    activation::{ActivateOutcome, ActivationEngine},
    quota::QuotaTracker,
    referral::{BindOutcome, ReferralEngine},
    storage::{CreditResult, LedgerStorage},
    withdrawal::{DecisionOutcome, WithdrawalProcessor},
};

/// Deployment policy for the ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Offset applied before cutting time into calendar days. One value
    /// for the whole deployment; every node must agree on "today"
    pub utc_offset_minutes: i32,

    /// Referral bonus policy
    pub referral: ReferralConfig,

    /// Pending withdrawals older than this are swept to Rejected
    pub withdrawal_expiry: Duration,

    /// Plan level to tier mapping
    pub schedule: PlanSchedule,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            referral: ReferralConfig::default(),
            withdrawal_expiry: Duration::from_secs(DEFAULT_WITHDRAWAL_EXPIRY_SECS),
            schedule: PlanSchedule::default(),
        }
    }
}

impl LedgerConfig {
    /// A runnable config has a usable schedule and a sane bonus ratio.
    pub fn is_valid(&self) -> bool {
        self.schedule.is_valid() && self.referral.is_valid()
    }
}

pub struct Ledger<S: LedgerStorage> {
    storage: Arc<S>,
    config: Arc<LedgerConfig>,
    accrual: AccrualEngine<S>,
    activation: ActivationEngine<S>,
    referral: ReferralEngine<S>,
    withdrawals: WithdrawalProcessor<S>,
}

impl<S: LedgerStorage> Ledger<S> {
    pub fn new(storage: Arc<S>, config: LedgerConfig) -> Self {
        let config = Arc::new(config);
        let quota = QuotaTracker::new(storage.clone(), config.clone());
        let referral = ReferralEngine::new(storage.clone(), config.clone());
        Self {
            accrual: AccrualEngine::new(storage.clone(), config.clone(), quota),
            activation: ActivationEngine::new(storage.clone(), config.clone(), referral.clone()),
            referral,
            withdrawals: WithdrawalProcessor::new(storage.clone()),
            storage,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Current ledger day under the configured UTC offset.
    pub fn today(&self) -> LedgerDay {
        LedgerDay::today(self.config.utc_offset_minutes)
    }

    /// Client-facing view with the plan name resolved from the schedule.
    pub fn summarize(&self, investment: &Investment) -> InvestmentSummary {
        InvestmentSummary::new(investment, self.config.schedule.get(investment.plan_level))
    }

    // ===== Accrual =====

    pub async fn credit_video_watch(
        &self,
        user_id: &UserId,
        video_id: &VideoId,
        investment_id: &InvestmentId,
        amount: Amount,
    ) -> LedgerResult<CreditResult> {
        self.accrual
            .credit_video_watch(user_id, video_id, investment_id, amount)
            .await
    }

    // ===== Investments =====

    pub async fn activate_investment(
        &self,
        investment_id: &InvestmentId,
        user_id: &UserId,
        plan_level: u8,
        amount_invested: Amount,
    ) -> LedgerResult<ActivateOutcome> {
        self.activation
            .activate(investment_id, user_id, plan_level, amount_invested)
            .await
    }

    pub async fn set_investment_status(
        &self,
        id: &InvestmentId,
        to: InvestmentStatus,
    ) -> LedgerResult<Investment> {
        self.storage.set_investment_status(id, to).await
    }

    pub async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Investment> {
        self.storage.get_investment(id).await
    }

    pub async fn get_user_investments(&self, user: &UserId) -> LedgerResult<Vec<Investment>> {
        self.storage.get_investments_by_user(user).await
    }

    // ===== Referrals =====

    pub async fn bind_referrer(
        &self,
        user_id: &UserId,
        referrer_id: &UserId,
    ) -> LedgerResult<BindOutcome> {
        self.referral.bind(user_id, referrer_id).await
    }

    // ===== Withdrawals =====

    pub async fn submit_withdrawal(
        &self,
        investment_id: &InvestmentId,
        amount: Amount,
        account_details: AccountDetails,
    ) -> LedgerResult<(WithdrawalRequest, Investment)> {
        self.withdrawals
            .submit(investment_id, amount, account_details)
            .await
    }

    pub async fn decide_withdrawal(
        &self,
        id: &WithdrawalId,
        decision: WithdrawalDecision,
        reason: Option<String>,
    ) -> LedgerResult<DecisionOutcome> {
        self.withdrawals.decide(id, decision, reason).await
    }

    pub async fn apply_payout_callback(
        &self,
        callback: &PayoutCallback,
    ) -> LedgerResult<(WithdrawalRequest, Investment)> {
        self.withdrawals.apply_payout_callback(callback).await
    }

    pub async fn get_withdrawal(&self, id: &WithdrawalId) -> LedgerResult<WithdrawalRequest> {
        self.storage.get_withdrawal(id).await
    }

    pub async fn get_investment_withdrawals(
        &self,
        investment_id: &InvestmentId,
    ) -> LedgerResult<Vec<WithdrawalRequest>> {
        self.storage.get_withdrawals_by_investment(investment_id).await
    }

    // ===== History and stats =====

    /// Reward history for a user, optionally narrowed to one day.
    pub async fn get_user_rewards(
        &self,
        user: &UserId,
        day: Option<LedgerDay>,
    ) -> LedgerResult<Vec<RewardEvent>> {
        match day {
            Some(day) => self.storage.get_rewards_for_day(user, day).await,
            None => self.storage.get_rewards_by_user(user).await,
        }
    }

    /// The daily stats panel: quota consumption plus today's earnings.
    ///
    /// A user without an active investment gets the all-zero shape; a
    /// user who has not watched anything today gets the cap straight
    /// from the schedule.
    pub async fn daily_stats(&self, user: &UserId) -> LedgerResult<DailyStatsResponse> {
        let active = self
            .storage
            .get_investments_by_user(user)
            .await?
            .into_iter()
            .find(|investment| investment.status.is_active());
        let Some(active) = active else {
            return Ok(DailyStatsResponse::no_active_investment());
        };

        let day = self.today();
        let earned = self.storage.sum_rewards_for_day(user, day).await?;
        match self.storage.get_quota(user, day).await? {
            Some(quota) => Ok(DailyStatsResponse::from_quota(&quota, earned)),
            None => {
                let limit = self
                    .config
                    .schedule
                    .daily_limit(active.plan_level)
                    .unwrap_or(0);
                Ok(DailyStatsResponse {
                    has_active_investment: true,
                    plan_level: active.plan_level,
                    daily_limit: limit,
                    videos_watched_today: 0,
                    earnings_today: earned,
                    remaining_views: limit,
                })
            }
        }
    }
}
