// Withdrawal request and reservation storage provider trait

use async_trait::async_trait;
use sika_common::{
    error::LedgerResult,
    ids::{InvestmentId, ReservationId, WithdrawalId},
    investment::Investment,
    money::Amount,
    withdrawal::{Reservation, WithdrawalRequest, WithdrawalStatus},
};

/// Storage provider for withdrawal requests and the holds backing them.
///
/// The money side lives in the reservation operations: `reserve` takes
/// the hold, `settle` turns it into a permanent debit, `release` gives
/// it back. Each one is a single atomic write against the investment
/// row, so a crash can not leave the balance half-moved. The request
/// record operations only track paperwork and may be reconciled by the
/// expiry sweep if a crash separates them from their reservation.
#[async_trait]
pub trait WithdrawalProvider {
    // ===== Reservations =====

    /// Take a hold on an investment's available earnings.
    ///
    /// Re-checks the status and the available balance under the
    /// investment's write lock, callers doing their own pre-checks are
    /// only buying a nicer error message.
    ///
    /// # Errors
    /// * `InvestmentNotFound` - No record with this id
    /// * `InvestmentNotActive` - Investment is matured or closed
    /// * `InsufficientBalance` - Hold is larger than available earnings
    async fn reserve_withdrawal(
        &self,
        investment_id: &InvestmentId,
        amount: Amount,
    ) -> LedgerResult<(Reservation, Investment)>;

    /// Turn a hold into a permanent debit.
    ///
    /// Settling an already settled reservation is a no-op returning the
    /// current state, so payout callbacks can be replayed.
    ///
    /// # Errors
    /// * `ReservationNotFound` - No hold with this id
    /// * `ReservationClosed` - The hold was already released
    async fn settle_reservation(
        &self,
        id: &ReservationId,
    ) -> LedgerResult<(Reservation, Investment)>;

    /// Give a hold back to available earnings.
    ///
    /// A no-op on a reservation that is already settled or released, so
    /// it can be retried any number of times.
    ///
    /// # Errors
    /// * `ReservationNotFound` - No hold with this id
    async fn release_reservation(
        &self,
        id: &ReservationId,
    ) -> LedgerResult<(Reservation, Investment)>;

    /// Get a reservation by id
    async fn get_reservation(&self, id: &ReservationId) -> LedgerResult<Reservation>;

    /// All reservations still holding funds, for the sweep
    async fn get_held_reservations(&self) -> LedgerResult<Vec<Reservation>>;

    // ===== Requests =====

    /// Persist a new withdrawal request and link its reservation back
    /// to it. The request must reference a held reservation.
    async fn create_withdrawal(&self, request: &WithdrawalRequest) -> LedgerResult<()>;

    /// Get a withdrawal request by id
    ///
    /// # Errors
    /// * `WithdrawalNotFound` - No request with this id
    async fn get_withdrawal(&self, id: &WithdrawalId) -> LedgerResult<WithdrawalRequest>;

    /// All withdrawal requests against an investment, oldest first
    async fn get_withdrawals_by_investment(
        &self,
        investment_id: &InvestmentId,
    ) -> LedgerResult<Vec<WithdrawalRequest>>;

    /// Requests still awaiting a decision, for the sweep
    async fn get_pending_withdrawals(&self) -> LedgerResult<Vec<WithdrawalRequest>>;

    /// Move a request through its state machine.
    ///
    /// The check and the write happen under the investment's lock, two
    /// racing decisions on the same request serialize here and the
    /// loser gets `InvalidTransition`.
    ///
    /// # Errors
    /// * `WithdrawalNotFound` - No request with this id
    /// * `InvalidTransition` - The state machine does not allow the move
    async fn transition_withdrawal(
        &self,
        id: &WithdrawalId,
        to: WithdrawalStatus,
        reason: Option<String>,
    ) -> LedgerResult<WithdrawalRequest>;
}
