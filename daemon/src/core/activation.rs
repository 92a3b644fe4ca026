// Investment activation
//
// Consumes "deposit confirmed" events from the payment collaborator.
// The event's investment id is its natural key: the collaborator may
// deliver it any number of times and exactly one record is created.

use std::sync::Arc;

use log::{debug, warn};
use metrics::counter;
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{InvestmentId, UserId},
    investment::Investment,
    money::Amount,
    time::get_current_time_in_millis,
};

use super::{ledger::LedgerConfig, referral::ReferralEngine, storage::LedgerStorage};

/// Outcome of consuming an activation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// First delivery, record created.
    Activated(Investment),
    /// Replayed delivery, the stored record is returned.
    AlreadyActivated(Investment),
}

impl ActivateOutcome {
    pub fn investment(&self) -> &Investment {
        match self {
            Self::Activated(investment) | Self::AlreadyActivated(investment) => investment,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::AlreadyActivated(_))
    }
}

pub struct ActivationEngine<S: LedgerStorage> {
    storage: Arc<S>,
    config: Arc<LedgerConfig>,
    referral: ReferralEngine<S>,
}

impl<S: LedgerStorage> ActivationEngine<S> {
    pub fn new(storage: Arc<S>, config: Arc<LedgerConfig>, referral: ReferralEngine<S>) -> Self {
        Self {
            storage,
            config,
            referral,
        }
    }

    /// Consume one activation event.
    ///
    /// # Errors
    /// * `UnknownPlanLevel` - The schedule has no tier for this level
    /// * `BelowPlanMinimum` - The deposit does not reach the tier minimum
    pub async fn activate(
        &self,
        investment_id: &InvestmentId,
        user_id: &UserId,
        plan_level: u8,
        amount_invested: Amount,
    ) -> LedgerResult<ActivateOutcome> {
        // Replays skip validation: the stored record already passed it,
        // and the schedule may have changed since
        if self.storage.has_investment(investment_id).await? {
            let existing = self.storage.get_investment(investment_id).await?;
            self.credit_referral_bonus(&existing).await;
            return Ok(ActivateOutcome::AlreadyActivated(existing));
        }

        let plan = self
            .config
            .schedule
            .get(plan_level)
            .ok_or(LedgerError::UnknownPlanLevel(plan_level))?;
        if amount_invested < plan.min_investment {
            return Err(LedgerError::BelowPlanMinimum {
                amount: amount_invested,
                minimum: plan.min_investment,
            });
        }

        let investment = Investment::new(
            *investment_id,
            user_id.clone(),
            plan_level,
            amount_invested,
            get_current_time_in_millis(),
        );
        if let Some(existing) = self.storage.create_investment(&investment).await? {
            self.credit_referral_bonus(&existing).await;
            return Ok(ActivateOutcome::AlreadyActivated(existing));
        }

        debug!(
            "Activated investment {} for {} on plan {} ({})",
            investment_id, user_id, plan_level, plan.name
        );
        counter!("sika_investments_activated_total").increment(1u64);

        self.credit_referral_bonus(&investment).await;
        Ok(ActivateOutcome::Activated(investment))
    }

    /// Feed the referral engine when the activated investment is the
    /// user's first, without failing the activation.
    ///
    /// Runs on replays too: if an earlier delivery created the record
    /// but the bonus write was cut off, the next delivery retries it,
    /// and the idempotency key keeps a paid bonus from paying again.
    async fn credit_referral_bonus(&self, investment: &Investment) {
        match self.is_first_investment(investment).await {
            Ok(true) => {
                if let Err(err) = self.referral.reward_for_activation(investment).await {
                    warn!(
                        "Referral bonus for activation of {} not credited: {}",
                        investment.id, err
                    );
                }
            }
            Ok(false) => {}
            Err(err) => warn!(
                "Could not check whether {} is a first investment: {}",
                investment.id, err
            ),
        }
    }

    /// True when this record is the user's oldest investment.
    async fn is_first_investment(&self, investment: &Investment) -> LedgerResult<bool> {
        let investments = self
            .storage
            .get_investments_by_user(&investment.user_id)
            .await?;
        Ok(investments.first().map(|first| first.id) == Some(investment.id))
    }
}
