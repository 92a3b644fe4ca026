use async_trait::async_trait;
use log::{debug, trace};
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{InvestmentId, UserId},
    investment::{Investment, InvestmentStatus},
    time::get_current_time_in_millis,
};

use crate::core::storage::{InvestmentProvider, SledStorage};

#[async_trait]
impl InvestmentProvider for SledStorage {
    async fn get_investment(&self, id: &InvestmentId) -> LedgerResult<Investment> {
        trace!("get investment {}", id);
        Self::load_optional(&self.investments, Self::id_key(id))?
            .ok_or(LedgerError::InvestmentNotFound(*id))
    }

    async fn has_investment(&self, id: &InvestmentId) -> LedgerResult<bool> {
        trace!("has investment {}", id);
        self.investments
            .contains_key(Self::id_key(id))
            .map_err(LedgerError::storage)
    }

    async fn get_investments_by_user(&self, user: &UserId) -> LedgerResult<Vec<Investment>> {
        trace!("get investments for user {}", user);
        let prefix = Self::user_prefix(user);
        let mut investments = Vec::new();
        for entry in self.investments_by_user.scan_prefix(&prefix) {
            let (key, _) = entry.map_err(LedgerError::storage)?;
            let id_bytes = &key[prefix.len()..];
            if let Some(investment) =
                Self::load_optional::<Investment>(&self.investments, id_bytes)?
            {
                investments.push(investment);
            }
        }
        investments.sort_by_key(|i| (i.activated_at, i.id));
        Ok(investments)
    }

    async fn create_investment(
        &self,
        investment: &Investment,
    ) -> LedgerResult<Option<Investment>> {
        debug!(
            "create investment {} for user {} at plan {}",
            investment.id, investment.user_id, investment.plan_level
        );
        let _guard = self.guard_investment(&investment.id).await;

        let value = Self::encode(investment)?;
        let cas = self
            .investments
            .compare_and_swap(Self::id_key(&investment.id), None as Option<&[u8]>, Some(value))
            .map_err(LedgerError::storage)?;

        match cas {
            Ok(()) => {
                let index_key =
                    Self::user_scoped_key(&investment.user_id, investment.id.as_bytes());
                self.investments_by_user
                    .insert(index_key, Self::empty_value())
                    .map_err(LedgerError::storage)?;
                Ok(None)
            }
            Err(prior) => {
                // Id already taken, hand back what is stored
                let current = prior.current.ok_or_else(|| {
                    LedgerError::storage(format!(
                        "investment {} vanished during create",
                        investment.id
                    ))
                })?;
                Ok(Some(Self::decode(&current)?))
            }
        }
    }

    async fn set_investment_status(
        &self,
        id: &InvestmentId,
        to: InvestmentStatus,
    ) -> LedgerResult<Investment> {
        debug!("set investment {} status to {}", id, to);
        let _guard = self.guard_investment(id).await;

        let mut investment: Investment = Self::load_optional(&self.investments, Self::id_key(id))?
            .ok_or(LedgerError::InvestmentNotFound(*id))?;

        if !investment.status.can_transition_to(to) {
            return Err(LedgerError::InvalidInvestmentTransition {
                id: *id,
                from: investment.status,
                to,
            });
        }

        investment.status = to;
        investment.updated_at = get_current_time_in_millis();
        self.investments
            .insert(Self::id_key(id), Self::encode(&investment)?)
            .map_err(LedgerError::storage)?;
        Ok(investment)
    }
}
