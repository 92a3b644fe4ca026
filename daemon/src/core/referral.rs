// Referral crediting
//
// A user binds at most one referrer; the referrer is paid a one-time
// bonus when the referred user's first investment activates. The bonus
// goes through the same keyed credit primitive as video rewards, so a
// re-delivered activation event can never pay twice.

use std::sync::Arc;

use log::debug;
use metrics::counter;
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{Id, UserId},
    investment::Investment,
    referral::ReferralBinding,
    reward::{IdempotencyKey, RewardEvent},
    time::{get_current_time_in_millis, LedgerDay},
};

use super::{
    ledger::LedgerConfig,
    storage::{CreditResult, LedgerStorage},
};

/// Outcome of a bind call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// First binding for this user.
    Bound(ReferralBinding),
    /// The same pair was already bound; a replay, not an error.
    AlreadyBound(ReferralBinding),
}

impl BindOutcome {
    pub fn binding(&self) -> &ReferralBinding {
        match self {
            Self::Bound(binding) | Self::AlreadyBound(binding) => binding,
        }
    }
}

pub struct ReferralEngine<S: LedgerStorage> {
    storage: Arc<S>,
    config: Arc<LedgerConfig>,
}

impl<S: LedgerStorage> Clone for ReferralEngine<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: LedgerStorage> ReferralEngine<S> {
    pub fn new(storage: Arc<S>, config: Arc<LedgerConfig>) -> Self {
        Self { storage, config }
    }

    /// Bind a referrer to a user, once.
    ///
    /// Rebinding the same pair is a replay; a different referrer for an
    /// already-bound user is refused.
    ///
    /// # Errors
    /// * `SelfReferral` - User and referrer are the same
    /// * `AlreadyBound` - The user is bound to a different referrer
    pub async fn bind(&self, user_id: &UserId, referrer_id: &UserId) -> LedgerResult<BindOutcome> {
        if user_id == referrer_id {
            return Err(LedgerError::SelfReferral);
        }

        let binding = ReferralBinding::new(
            user_id.clone(),
            referrer_id.clone(),
            get_current_time_in_millis(),
        );
        match self.storage.bind_referrer(&binding).await? {
            None => {
                debug!("Bound {} to referrer {}", user_id, referrer_id);
                Ok(BindOutcome::Bound(binding))
            }
            Some(existing) if existing.referrer_id == *referrer_id => {
                Ok(BindOutcome::AlreadyBound(existing))
            }
            Some(_) => Err(LedgerError::AlreadyBound),
        }
    }

    /// Pay the referrer's bonus for a referred user's qualifying
    /// activation, if a referrer is bound.
    ///
    /// Keyed on the referred user, so replays of the activation event
    /// resolve to the original credit. Returns None when the user has no
    /// referrer or the configured bonus truncates to zero.
    ///
    /// # Errors
    /// * `NoActiveInvestment` - The referrer has nowhere to credit the bonus
    pub async fn reward_for_activation(
        &self,
        activated: &Investment,
    ) -> LedgerResult<Option<CreditResult>> {
        let Some(binding) = self.storage.get_referral_binding(&activated.user_id).await? else {
            return Ok(None);
        };

        let bonus = activated
            .amount_invested
            .mul_bps(self.config.referral.bonus_bps);
        if bonus.is_zero() {
            return Ok(None);
        }

        // One qualifying event per referred user: their first activated
        // investment. The key carries the user, not the investment, so
        // a later investment by the same user pays nothing.
        let event_id = format!("first-investment:{}", activated.user_id);
        let key = IdempotencyKey::ReferralBonus {
            event_id: event_id.clone(),
        };
        if let Some(prior) = self.storage.get_reward(&key).await? {
            let investment = self.storage.get_investment(&prior.investment_id).await?;
            return Ok(Some(CreditResult::AlreadyApplied {
                investment,
                reward: prior,
            }));
        }

        // The bonus lands on the referrer's earliest active investment
        let target = self
            .storage
            .get_investments_by_user(&binding.referrer_id)
            .await?
            .into_iter()
            .find(|investment| investment.status.is_active())
            .ok_or_else(|| LedgerError::NoActiveInvestment(binding.referrer_id.clone()))?;

        let now = get_current_time_in_millis();
        let day = LedgerDay::from_millis(now, self.config.utc_offset_minutes);
        let event = RewardEvent::referral_bonus(
            Id::random(),
            target.id,
            binding.referrer_id.clone(),
            activated.user_id.clone(),
            event_id,
            bonus,
            day,
            now,
        );

        let result = self.storage.credit_earnings(&target.id, event).await?;
        if !result.is_replay() {
            debug!(
                "Referral bonus {} paid to {} for activation by {}",
                bonus, binding.referrer_id, activated.user_id
            );
            counter!("sika_referral_bonus_total").increment(1u64);
        }
        Ok(Some(result))
    }
}
