// Accrual engine
//
// Turns a video-watch-completion event into an earnings credit. The
// driving concern is that the same watch arrives more than once (two
// devices, a duplicated onEnded signal, a client retry): the (user,
// video, day) key makes every duplicate resolve to the first credit.

use std::sync::Arc;

use log::{debug, warn};
use metrics::counter;
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{Id, InvestmentId, UserId, VideoId},
    money::Amount,
    reward::{IdempotencyKey, RewardEvent},
    time::{get_current_time_in_millis, LedgerDay},
};

use super::{
    ledger::LedgerConfig,
    quota::QuotaTracker,
    storage::{CreditResult, LedgerStorage},
};

pub struct AccrualEngine<S: LedgerStorage> {
    storage: Arc<S>,
    config: Arc<LedgerConfig>,
    quota: QuotaTracker<S>,
}

impl<S: LedgerStorage> AccrualEngine<S> {
    pub fn new(storage: Arc<S>, config: Arc<LedgerConfig>, quota: QuotaTracker<S>) -> Self {
        Self {
            storage,
            config,
            quota,
        }
    }

    /// Credit one watched video to an investment.
    ///
    /// Safe to retry an unbounded number of times: replays of a key that
    /// already credited come back as `AlreadyApplied` carrying the
    /// original event, without consuming quota or touching the balance.
    ///
    /// # Errors
    /// * `NonPositiveAmount` - Zero reward amount
    /// * `InvestmentNotFound` - Unknown investment, or one owned by another user
    /// * `InvestmentNotActive` - Investment is matured or closed
    /// * `QuotaExceeded` - The day's cap is reached
    pub async fn credit_video_watch(
        &self,
        user_id: &UserId,
        video_id: &VideoId,
        investment_id: &InvestmentId,
        amount: Amount,
    ) -> LedgerResult<CreditResult> {
        if amount.is_zero() {
            return Err(LedgerError::NonPositiveAmount);
        }

        let now = get_current_time_in_millis();
        let day = LedgerDay::from_millis(now, self.config.utc_offset_minutes);
        let key = IdempotencyKey::VideoWatch {
            user_id: user_id.clone(),
            video_id: video_id.clone(),
            day,
        };

        // Replay fast path, so a duplicate does not burn a quota slot.
        // The keyed insert below stays authoritative; this check only
        // has to catch most duplicates, not all of them.
        if let Some(prior) = self.storage.get_reward(&key).await? {
            let investment = self.storage.get_investment(&prior.investment_id).await?;
            debug!("Video watch {} replayed, first credited at {}", key, prior.created_at);
            counter!("sika_rewards_replayed_total").increment(1u64);
            return Ok(CreditResult::AlreadyApplied {
                investment,
                reward: prior,
            });
        }

        let investment = self.storage.get_investment(investment_id).await?;
        // Ownership is part of the lookup: an id belonging to another
        // user behaves exactly like an unknown id
        if investment.user_id != *user_id {
            return Err(LedgerError::InvestmentNotFound(*investment_id));
        }
        if !investment.status.is_active() {
            return Err(LedgerError::InvestmentNotActive {
                id: investment.id,
                status: investment.status,
            });
        }

        let quota = match self.quota.consume_slot(user_id, investment.plan_level, day).await {
            Ok(quota) => quota,
            Err(err @ LedgerError::QuotaExceeded { .. }) => {
                counter!("sika_quota_denied_total").increment(1u64);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let event = RewardEvent::video_watch(
            Id::random(),
            *investment_id,
            user_id.clone(),
            video_id.clone(),
            day,
            amount,
            now,
        );

        match self.storage.credit_earnings(investment_id, event).await {
            Ok(result @ CreditResult::Applied { .. }) => {
                debug!(
                    "Credited {} to investment {} ({} of {} videos today)",
                    amount, investment_id, quota.consumed, quota.limit
                );
                counter!("sika_rewards_credited_total").increment(1u64);
                Ok(result)
            }
            Ok(result) => {
                // Lost the insert race to a concurrent duplicate; the
                // winning request paid for the slot this one consumed
                self.refund_slot(user_id, day).await;
                counter!("sika_rewards_replayed_total").increment(1u64);
                Ok(result)
            }
            Err(err) => {
                // A failed refund leaves the slot spent while no money
                // moved; never the other way around
                self.refund_slot(user_id, day).await;
                Err(err)
            }
        }
    }

    async fn refund_slot(&self, user_id: &UserId, day: LedgerDay) {
        if let Err(err) = self.quota.give_back_slot(user_id, day).await {
            warn!(
                "Failed to return a quota slot to {} for {}: {}",
                user_id, day, err
            );
        }
    }
}
