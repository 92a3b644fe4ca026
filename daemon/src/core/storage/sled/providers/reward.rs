use async_trait::async_trait;
use log::{debug, trace};
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{InvestmentId, UserId},
    investment::Investment,
    money::Amount,
    reward::{IdempotencyKey, RewardEvent},
    time::LedgerDay,
};
use sled::{transaction::ConflictableTransactionError, Transactional};

use crate::core::storage::{CreditResult, InvestmentProvider, RewardProvider, SledStorage};

impl SledStorage {
    fn load_rewards_by_index_prefix(&self, prefix: &[u8]) -> LedgerResult<Vec<RewardEvent>> {
        let mut rewards = Vec::new();
        for entry in self.rewards_by_user_day.scan_prefix(prefix) {
            let (_, primary_key) = entry.map_err(LedgerError::storage)?;
            if let Some(event) = Self::load_optional::<RewardEvent>(&self.rewards, &primary_key)? {
                rewards.push(event);
            }
        }
        rewards.sort_by_key(|r| (r.created_at, r.id));
        Ok(rewards)
    }
}

#[async_trait]
impl RewardProvider for SledStorage {
    async fn credit_earnings(
        &self,
        investment_id: &InvestmentId,
        event: RewardEvent,
    ) -> LedgerResult<CreditResult> {
        let key = event.idempotency_key();
        let key_bytes = Self::encode(&key)?;

        let _guard = self.guard_investment(investment_id).await;

        // Replay check under the lock. The check also catches events
        // persisted by a previous run of the process.
        if let Some(prior) = Self::load_optional::<RewardEvent>(&self.rewards, &key_bytes)? {
            trace!("reward key {} already credited", key);
            let investment = self.get_investment(&prior.investment_id).await?;
            return Ok(CreditResult::AlreadyApplied {
                investment,
                reward: prior,
            });
        }

        debug!(
            "credit {} to investment {} for key {}",
            event.amount, investment_id, key
        );

        let updated = (&self.investments, &self.rewards)
            .transaction(|(inv_t, rw_t)| {
                let bytes = inv_t.get(Self::id_key(investment_id))?.ok_or(
                    ConflictableTransactionError::Abort(LedgerError::InvestmentNotFound(
                        *investment_id,
                    )),
                )?;
                let mut investment: Investment = Self::tx_decode(&bytes)?;
                if !investment.status.is_active() {
                    return Self::tx_abort(LedgerError::InvestmentNotActive {
                        id: *investment_id,
                        status: investment.status,
                    });
                }

                investment
                    .credit(event.amount, event.created_at)
                    .map_err(ConflictableTransactionError::Abort)?;

                inv_t.insert(Self::id_key(investment_id), Self::tx_encode(&investment)?)?;
                rw_t.insert(key_bytes.as_slice(), Self::tx_encode(&event)?)?;
                Ok(investment)
            })
            .map_err(Self::unwrap_tx_error)?;

        // Day index outside the money transaction. If we crash before
        // this lands the event still exists and still blocks replays,
        // only the stats scan misses it.
        let index_key = Self::reward_day_key(&event.user_id, event.day, &event.id);
        self.rewards_by_user_day
            .insert(index_key, key_bytes)
            .map_err(LedgerError::storage)?;

        Ok(CreditResult::Applied {
            investment: updated,
            reward: event,
        })
    }

    async fn get_reward(&self, key: &IdempotencyKey) -> LedgerResult<Option<RewardEvent>> {
        trace!("get reward {}", key);
        let key_bytes = Self::encode(key)?;
        Self::load_optional(&self.rewards, &key_bytes)
    }

    async fn get_rewards_by_user(&self, user: &UserId) -> LedgerResult<Vec<RewardEvent>> {
        trace!("get rewards for user {}", user);
        self.load_rewards_by_index_prefix(&Self::user_prefix(user))
    }

    async fn get_rewards_for_day(
        &self,
        user: &UserId,
        day: LedgerDay,
    ) -> LedgerResult<Vec<RewardEvent>> {
        trace!("get rewards for user {} on {}", user, day);
        self.load_rewards_by_index_prefix(&Self::user_day_key(user, day))
    }

    async fn sum_rewards_for_day(&self, user: &UserId, day: LedgerDay) -> LedgerResult<Amount> {
        let rewards = self.get_rewards_for_day(user, day).await?;
        let mut total = Amount::ZERO;
        for reward in &rewards {
            total = total.checked_add(reward.amount).ok_or_else(|| {
                LedgerError::storage(format!("daily earnings overflow for user {}", user))
            })?;
        }
        Ok(total)
    }
}
