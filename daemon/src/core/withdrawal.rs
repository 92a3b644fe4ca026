// Withdrawal processing
//
// The money side moves strictly through the reservation: reserve, then
// settle or release, exactly one of the two. The request record is the
// paperwork operators and the payout gateway act on, and every move it
// makes runs through the request state machine, so a decision lands at
// most once.

use std::sync::Arc;

use log::{debug, warn};
use metrics::counter;
use sika_common::{
    api::{
        payout::{PayoutCallback, PayoutIntent, PayoutStatus},
        WithdrawalDecision,
    },
    error::{LedgerError, LedgerResult},
    ids::{Id, InvestmentId, WithdrawalId},
    investment::Investment,
    money::Amount,
    time::get_current_time_in_millis,
    withdrawal::{AccountDetails, WithdrawalRequest, WithdrawalStatus},
};

use super::storage::LedgerStorage;

/// What a decision produced. `payout` is present on approval; the caller
/// forwards it to the gateway after every lock is out of the picture.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub withdrawal: WithdrawalRequest,
    pub investment: Investment,
    pub payout: Option<PayoutIntent>,
}

pub struct WithdrawalProcessor<S: LedgerStorage> {
    storage: Arc<S>,
}

impl<S: LedgerStorage> WithdrawalProcessor<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Submit a withdrawal request against an investment.
    ///
    /// The hold is taken first: from the moment this returns, a second
    /// submit sees the reduced available balance.
    ///
    /// # Errors
    /// * `NonPositiveAmount` - Zero amount
    /// * `InvalidAccountDetails` - Blank payout destination field
    /// * `InvestmentNotFound` - No investment with this id
    /// * `InvestmentNotActive` - Investment is matured or closed
    /// * `InsufficientBalance` - Amount above available earnings
    pub async fn submit(
        &self,
        investment_id: &InvestmentId,
        amount: Amount,
        account_details: AccountDetails,
    ) -> LedgerResult<(WithdrawalRequest, Investment)> {
        if amount.is_zero() {
            return Err(LedgerError::NonPositiveAmount);
        }
        account_details.validate()?;

        let (reservation, investment) =
            self.storage.reserve_withdrawal(investment_id, amount).await?;

        let request = WithdrawalRequest::new(
            Id::random(),
            *investment_id,
            amount,
            account_details,
            reservation.id,
            get_current_time_in_millis(),
        );
        if let Err(err) = self.storage.create_withdrawal(&request).await {
            // Hand the hold back; if that fails as well the expiry
            // sweep picks the orphaned reservation up later
            if let Err(release_err) = self.storage.release_reservation(&reservation.id).await {
                warn!(
                    "Reservation {} left held after failed submit: {}",
                    reservation.id, release_err
                );
            }
            return Err(err);
        }

        debug!(
            "Withdrawal {} submitted: {} from investment {}",
            request.id, amount, investment_id
        );
        counter!("sika_withdrawals_submitted_total").increment(1u64);
        Ok((request, investment))
    }

    /// Apply an operator decision to a pending request.
    ///
    /// # Errors
    /// * `WithdrawalNotFound` - No request with this id
    /// * `InvalidTransition` - The request is not Pending
    pub async fn decide(
        &self,
        id: &WithdrawalId,
        decision: WithdrawalDecision,
        reason: Option<String>,
    ) -> LedgerResult<DecisionOutcome> {
        match decision {
            WithdrawalDecision::Approve => self.approve(id).await,
            WithdrawalDecision::Reject => self.reject(id, reason).await,
        }
    }

    async fn approve(&self, id: &WithdrawalId) -> LedgerResult<DecisionOutcome> {
        let withdrawal = self
            .storage
            .transition_withdrawal(id, WithdrawalStatus::Approved, None)
            .await?;
        let investment = self.storage.get_investment(&withdrawal.investment_id).await?;

        // The intent leaves the ledger here; no lock is held while the
        // caller talks to the gateway
        let payout = PayoutIntent {
            withdrawal_id: withdrawal.id,
            amount: withdrawal.amount,
            account_details: withdrawal.account_details.clone(),
            created_at: get_current_time_in_millis(),
        };
        debug!("Withdrawal {} approved, payout intent emitted", withdrawal.id);
        counter!("sika_withdrawals_approved_total").increment(1u64);
        Ok(DecisionOutcome {
            withdrawal,
            investment,
            payout: Some(payout),
        })
    }

    async fn reject(
        &self,
        id: &WithdrawalId,
        reason: Option<String>,
    ) -> LedgerResult<DecisionOutcome> {
        let withdrawal = self
            .storage
            .transition_withdrawal(id, WithdrawalStatus::Rejected, reason)
            .await?;
        // The record turns terminal before the money moves back; a
        // crash between the two writes is healed by the sweep, which
        // releases holds behind Rejected requests
        let (_, investment) = self
            .storage
            .release_reservation(&withdrawal.reservation_id)
            .await?;
        debug!("Withdrawal {} rejected, hold released", withdrawal.id);
        counter!("sika_withdrawals_rejected_total").increment(1u64);
        Ok(DecisionOutcome {
            withdrawal,
            investment,
            payout: None,
        })
    }

    /// Apply the payout gateway's terminal callback.
    ///
    /// Replays of a callback that already landed return the current
    /// state; a callback contradicting an earlier terminal outcome is an
    /// `InvalidTransition`.
    ///
    /// # Errors
    /// * `WithdrawalNotFound` - No request with this id
    /// * `InvalidTransition` - Request is Pending (never approved) or
    ///   terminal with the opposite outcome
    pub async fn apply_payout_callback(
        &self,
        callback: &PayoutCallback,
    ) -> LedgerResult<(WithdrawalRequest, Investment)> {
        let withdrawal = self.storage.get_withdrawal(&callback.withdrawal_id).await?;
        let target = match callback.status {
            PayoutStatus::Success => WithdrawalStatus::Settled,
            PayoutStatus::Failure => WithdrawalStatus::Rejected,
        };

        if withdrawal.status.is_terminal() {
            if withdrawal.status != target {
                return Err(LedgerError::InvalidTransition {
                    id: withdrawal.id,
                    from: withdrawal.status,
                    to: target,
                });
            }
            // Replayed callback. Re-running the reservation side is a
            // no-op when it already completed and finishes the job when
            // a crash separated the two writes
            let (_, investment) = match target {
                WithdrawalStatus::Settled => {
                    self.storage
                        .settle_reservation(&withdrawal.reservation_id)
                        .await?
                }
                _ => {
                    self.storage
                        .release_reservation(&withdrawal.reservation_id)
                        .await?
                }
            };
            return Ok((withdrawal, investment));
        }

        match callback.status {
            PayoutStatus::Success => {
                let withdrawal = self
                    .storage
                    .transition_withdrawal(&callback.withdrawal_id, WithdrawalStatus::Settled, None)
                    .await?;
                let (_, investment) = self
                    .storage
                    .settle_reservation(&withdrawal.reservation_id)
                    .await?;
                debug!("Withdrawal {} settled by gateway callback", withdrawal.id);
                counter!("sika_withdrawals_settled_total").increment(1u64);
                Ok((withdrawal, investment))
            }
            PayoutStatus::Failure => {
                let reason = callback
                    .error
                    .clone()
                    .unwrap_or_else(|| "payout failed".to_string());
                let outcome = self.reject(&callback.withdrawal_id, Some(reason)).await?;
                Ok((outcome.withdrawal, outcome.investment))
            }
        }
    }
}
