use async_trait::async_trait;
use log::{debug, trace, warn};
use sika_common::{
    error::{LedgerError, LedgerResult},
    ids::{Id, InvestmentId, ReservationId, WithdrawalId},
    investment::Investment,
    money::Amount,
    time::get_current_time_in_millis,
    withdrawal::{Reservation, ReservationState, WithdrawalRequest, WithdrawalStatus},
};
use sled::{transaction::ConflictableTransactionError, Transactional};

use crate::core::storage::{SledStorage, WithdrawalProvider};

impl SledStorage {
    fn withdrawal_index_key(investment_id: &InvestmentId, withdrawal_id: &WithdrawalId) -> Vec<u8> {
        let mut key = investment_id.as_bytes().to_vec();
        key.extend_from_slice(withdrawal_id.as_bytes());
        key
    }
}

#[async_trait]
impl WithdrawalProvider for SledStorage {
    async fn reserve_withdrawal(
        &self,
        investment_id: &InvestmentId,
        amount: Amount,
    ) -> LedgerResult<(Reservation, Investment)> {
        let _guard = self.guard_investment(investment_id).await;
        let now = get_current_time_in_millis();
        let reservation = Reservation::new(Id::random(), *investment_id, amount, now);

        debug!(
            "reserve {} on investment {} as {}",
            amount, investment_id, reservation.id
        );

        let updated = (&self.investments, &self.reservations)
            .transaction(|(inv_t, res_t)| {
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
                    .reserve(amount, now)
                    .map_err(ConflictableTransactionError::Abort)?;

                inv_t.insert(Self::id_key(investment_id), Self::tx_encode(&investment)?)?;
                res_t.insert(
                    Self::id_key(&reservation.id),
                    Self::tx_encode(&reservation)?,
                )?;
                Ok(investment)
            })
            .map_err(Self::unwrap_tx_error)?;

        Ok((reservation, updated))
    }

    async fn settle_reservation(
        &self,
        id: &ReservationId,
    ) -> LedgerResult<(Reservation, Investment)> {
        let investment_id = self.get_reservation(id).await?.investment_id;
        let _guard = self.guard_investment(&investment_id).await;
        let now = get_current_time_in_millis();

        (&self.investments, &self.reservations)
            .transaction(|(inv_t, res_t)| {
                let bytes = res_t.get(Self::id_key(id))?.ok_or(
                    ConflictableTransactionError::Abort(LedgerError::ReservationNotFound(*id)),
                )?;
                let mut reservation: Reservation = Self::tx_decode(&bytes)?;

                let inv_bytes = inv_t.get(Self::id_key(&reservation.investment_id))?.ok_or(
                    ConflictableTransactionError::Abort(LedgerError::InvestmentNotFound(
                        reservation.investment_id,
                    )),
                )?;
                let mut investment: Investment = Self::tx_decode(&inv_bytes)?;

                match reservation.state {
                    ReservationState::Held => {}
                    // Settle is replayable, the money moved exactly once
                    ReservationState::Settled => return Ok((reservation, investment)),
                    ReservationState::Released => {
                        return Self::tx_abort(LedgerError::ReservationClosed {
                            id: *id,
                            state: reservation.state,
                        });
                    }
                }

                investment
                    .settle_hold(reservation.amount, now)
                    .map_err(ConflictableTransactionError::Abort)?;
                reservation.state = ReservationState::Settled;
                reservation.updated_at = now;

                inv_t.insert(
                    Self::id_key(&reservation.investment_id),
                    Self::tx_encode(&investment)?,
                )?;
                res_t.insert(Self::id_key(id), Self::tx_encode(&reservation)?)?;
                Ok((reservation, investment))
            })
            .map_err(Self::unwrap_tx_error)
    }

    async fn release_reservation(
        &self,
        id: &ReservationId,
    ) -> LedgerResult<(Reservation, Investment)> {
        let investment_id = self.get_reservation(id).await?.investment_id;
        let _guard = self.guard_investment(&investment_id).await;
        let now = get_current_time_in_millis();

        (&self.investments, &self.reservations)
            .transaction(|(inv_t, res_t)| {
                let bytes = res_t.get(Self::id_key(id))?.ok_or(
                    ConflictableTransactionError::Abort(LedgerError::ReservationNotFound(*id)),
                )?;
                let mut reservation: Reservation = Self::tx_decode(&bytes)?;

                let inv_bytes = inv_t.get(Self::id_key(&reservation.investment_id))?.ok_or(
                    ConflictableTransactionError::Abort(LedgerError::InvestmentNotFound(
                        reservation.investment_id,
                    )),
                )?;
                let mut investment: Investment = Self::tx_decode(&inv_bytes)?;

                // Releasing a closed hold is a no-op either way: settled
                // money stays moved, released money stays back
                if !reservation.state.is_open() {
                    return Ok((reservation, investment));
                }

                investment
                    .release_hold(reservation.amount, now)
                    .map_err(ConflictableTransactionError::Abort)?;
                reservation.state = ReservationState::Released;
                reservation.updated_at = now;

                inv_t.insert(
                    Self::id_key(&reservation.investment_id),
                    Self::tx_encode(&investment)?,
                )?;
                res_t.insert(Self::id_key(id), Self::tx_encode(&reservation)?)?;
                Ok((reservation, investment))
            })
            .map_err(Self::unwrap_tx_error)
    }

    async fn get_reservation(&self, id: &ReservationId) -> LedgerResult<Reservation> {
        trace!("get reservation {}", id);
        Self::load_optional(&self.reservations, Self::id_key(id))?
            .ok_or(LedgerError::ReservationNotFound(*id))
    }

    async fn get_held_reservations(&self) -> LedgerResult<Vec<Reservation>> {
        trace!("get held reservations");
        let mut held = Vec::new();
        for entry in self.reservations.iter() {
            let (_, bytes) = entry.map_err(LedgerError::storage)?;
            let reservation: Reservation = Self::decode(&bytes)?;
            if reservation.state.is_open() {
                held.push(reservation);
            }
        }
        held.sort_by_key(|r| (r.created_at, r.id));
        Ok(held)
    }

    async fn create_withdrawal(&self, request: &WithdrawalRequest) -> LedgerResult<()> {
        let _guard = self.guard_investment(&request.investment_id).await;
        let now = get_current_time_in_millis();

        debug!(
            "create withdrawal {} of {} against investment {}",
            request.id, request.amount, request.investment_id
        );

        (&self.withdrawals, &self.reservations)
            .transaction(|(wd_t, res_t)| {
                let bytes = res_t.get(Self::id_key(&request.reservation_id))?.ok_or(
                    ConflictableTransactionError::Abort(LedgerError::ReservationNotFound(
                        request.reservation_id,
                    )),
                )?;
                let mut reservation: Reservation = Self::tx_decode(&bytes)?;

                if !reservation.state.is_open() {
                    return Self::tx_abort(LedgerError::ReservationClosed {
                        id: reservation.id,
                        state: reservation.state,
                    });
                }
                if let Some(linked) = reservation.withdrawal_id {
                    if linked != request.id {
                        return Self::tx_abort(LedgerError::storage(format!(
                            "reservation {} already backs withdrawal {}",
                            reservation.id, linked
                        )));
                    }
                }

                reservation.withdrawal_id = Some(request.id);
                reservation.updated_at = now;

                wd_t.insert(Self::id_key(&request.id), Self::tx_encode(request)?)?;
                res_t.insert(
                    Self::id_key(&reservation.id),
                    Self::tx_encode(&reservation)?,
                )?;
                Ok(())
            })
            .map_err(Self::unwrap_tx_error)?;

        // Lookup indexes. A crash here leaves the record reachable by id
        // and the sweep reconciles the rest from the reservation side.
        self.withdrawals_by_investment
            .insert(
                Self::withdrawal_index_key(&request.investment_id, &request.id),
                Self::empty_value(),
            )
            .map_err(LedgerError::storage)?;
        self.pending_withdrawals
            .insert(Self::id_key(&request.id), Self::empty_value())
            .map_err(LedgerError::storage)?;
        Ok(())
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> LedgerResult<WithdrawalRequest> {
        trace!("get withdrawal {}", id);
        Self::load_optional(&self.withdrawals, Self::id_key(id))?
            .ok_or(LedgerError::WithdrawalNotFound(*id))
    }

    async fn get_withdrawals_by_investment(
        &self,
        investment_id: &InvestmentId,
    ) -> LedgerResult<Vec<WithdrawalRequest>> {
        trace!("get withdrawals for investment {}", investment_id);
        let prefix = investment_id.as_bytes();
        let mut requests = Vec::new();
        for entry in self.withdrawals_by_investment.scan_prefix(prefix) {
            let (key, _) = entry.map_err(LedgerError::storage)?;
            let id_bytes = &key[prefix.len()..];
            if let Some(request) =
                Self::load_optional::<WithdrawalRequest>(&self.withdrawals, id_bytes)?
            {
                requests.push(request);
            }
        }
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    async fn get_pending_withdrawals(&self) -> LedgerResult<Vec<WithdrawalRequest>> {
        trace!("get pending withdrawals");
        let mut pending = Vec::new();
        let mut stale = Vec::new();
        for entry in self.pending_withdrawals.iter() {
            let (key, _) = entry.map_err(LedgerError::storage)?;
            match Self::load_optional::<WithdrawalRequest>(&self.withdrawals, &key)? {
                Some(request) if request.status == WithdrawalStatus::Pending => {
                    pending.push(request)
                }
                // Decided or missing, the index entry is leftover
                _ => stale.push(key),
            }
        }
        for key in stale {
            warn!("dropping stale pending index entry");
            self.pending_withdrawals
                .remove(key)
                .map_err(LedgerError::storage)?;
        }
        pending.sort_by_key(|r| (r.created_at, r.id));
        Ok(pending)
    }

    async fn transition_withdrawal(
        &self,
        id: &WithdrawalId,
        to: WithdrawalStatus,
        reason: Option<String>,
    ) -> LedgerResult<WithdrawalRequest> {
        let investment_id = self.get_withdrawal(id).await?.investment_id;
        let _guard = self.guard_investment(&investment_id).await;
        let now = get_current_time_in_millis();

        let mut request: WithdrawalRequest =
            Self::load_optional(&self.withdrawals, Self::id_key(id))?
                .ok_or(LedgerError::WithdrawalNotFound(*id))?;

        request.transition(to, now)?;
        if to == WithdrawalStatus::Rejected {
            request.reject_reason = reason;
        }

        debug!("withdrawal {} moved to {}", id, to);
        self.withdrawals
            .insert(Self::id_key(id), Self::encode(&request)?)
            .map_err(LedgerError::storage)?;
        self.pending_withdrawals
            .remove(Self::id_key(id))
            .map_err(LedgerError::storage)?;
        Ok(request)
    }
}
