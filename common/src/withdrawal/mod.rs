// Withdrawal requests and balance reservations
//
// A request moves Pending -> Approved -> Settled, with Rejected reachable
// from Pending (operator denial, expiry) and from Approved (failed payout).
// Money safety lives in the paired Reservation: the hold is taken before the
// request exists and is either settled into a permanent debit or released
// back, never both.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{LedgerError, LedgerResult},
    ids::{InvestmentId, ReservationId, WithdrawalId},
    money::Amount,
    time::TimestampMillis,
};

/// Withdrawal request lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Submitted, hold taken, awaiting a decision.
    Pending,
    /// Accepted for payout, hold still in place.
    Approved,
    /// Denied or payout failed. Terminal, hold released.
    Rejected,
    /// Paid out. Terminal, hold settled into a permanent debit.
    Settled,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Settled)
    }

    pub fn can_transition_to(self, to: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Settled) | (Approved, Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Settled => "settled",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mobile money destination for a payout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountDetails {
    /// Momo provider name, e.g. "MTN", "AirtelTigo", "Vodafone"
    pub provider: String,
    pub phone_number: String,
    pub account_name: String,
}

impl AccountDetails {
    /// Every field must carry something; client-side form checks are
    /// hints only.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.provider.trim().is_empty() {
            return Err(LedgerError::InvalidAccountDetails(
                "momo provider is required".to_string(),
            ));
        }
        if self.phone_number.trim().is_empty() {
            return Err(LedgerError::InvalidAccountDetails(
                "phone number is required".to_string(),
            ));
        }
        if self.account_name.trim().is_empty() {
            return Err(LedgerError::InvalidAccountDetails(
                "account name is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One withdrawal request against one investment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,

    pub investment_id: InvestmentId,

    pub amount: Amount,

    pub account_details: AccountDetails,

    pub status: WithdrawalStatus,

    /// Hold backing this request
    pub reservation_id: ReservationId,

    pub created_at: TimestampMillis,

    /// Time of the most recent decision, None while Pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<TimestampMillis>,

    /// Operator or system note for a rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl WithdrawalRequest {
    pub fn new(
        id: WithdrawalId,
        investment_id: InvestmentId,
        amount: Amount,
        account_details: AccountDetails,
        reservation_id: ReservationId,
        now: TimestampMillis,
    ) -> Self {
        Self {
            id,
            investment_id,
            amount,
            account_details,
            status: WithdrawalStatus::Pending,
            reservation_id,
            created_at: now,
            decided_at: None,
            reject_reason: None,
        }
    }

    /// Apply a status transition, rejecting anything the state machine
    /// does not allow. A terminal request never moves again.
    pub fn transition(&mut self, to: WithdrawalStatus, now: TimestampMillis) -> LedgerResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.decided_at = Some(now);
        Ok(())
    }
}

/// Lifecycle of a balance hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// Amount held out of available earnings.
    Held,
    /// Hold became a permanent debit.
    Settled,
    /// Hold given back to available earnings.
    Released,
}

impl ReservationState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Held)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Settled => "settled",
            Self::Released => "released",
        }
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hold against one investment's available earnings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,

    pub investment_id: InvestmentId,

    pub amount: Amount,

    pub state: ReservationState,

    /// Request backed by this hold, None between the hold being taken
    /// and the request record being written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_id: Option<WithdrawalId>,

    pub created_at: TimestampMillis,

    pub updated_at: TimestampMillis,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        investment_id: InvestmentId,
        amount: Amount,
        now: TimestampMillis,
    ) -> Self {
        Self {
            id,
            investment_id,
            amount,
            state: ReservationState::Held,
            withdrawal_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Id;

    fn request() -> WithdrawalRequest {
        WithdrawalRequest::new(
            Id::random(),
            Id::random(),
            Amount::from_whole(60),
            AccountDetails {
                provider: "MTN".to_string(),
                phone_number: "0241234567".to_string(),
                account_name: "Ama Mensah".to_string(),
            },
            Id::random(),
            1000,
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut req = request();
        assert_eq!(req.status, WithdrawalStatus::Pending);
        assert_eq!(req.decided_at, None);

        req.transition(WithdrawalStatus::Approved, 2000).expect("test");
        assert_eq!(req.decided_at, Some(2000));

        req.transition(WithdrawalStatus::Settled, 3000).expect("test");
        assert_eq!(req.status, WithdrawalStatus::Settled);
        assert!(req.status.is_terminal());
    }

    #[test]
    fn test_approved_can_still_fail() {
        let mut req = request();
        req.transition(WithdrawalStatus::Approved, 2000).expect("test");
        req.transition(WithdrawalStatus::Rejected, 3000).expect("test");
        assert_eq!(req.status, WithdrawalStatus::Rejected);
    }

    #[test]
    fn test_terminal_states_never_move() {
        let mut req = request();
        req.transition(WithdrawalStatus::Rejected, 2000).expect("test");

        for target in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Settled,
            WithdrawalStatus::Rejected,
        ] {
            let err = req.clone().transition(target, 3000).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_account_details_validation() {
        let details = AccountDetails {
            provider: "MTN".to_string(),
            phone_number: "0241234567".to_string(),
            account_name: "Ama Mensah".to_string(),
        };
        assert!(details.validate().is_ok());

        let mut blank_provider = details.clone();
        blank_provider.provider = "  ".to_string();
        assert!(matches!(
            blank_provider.validate(),
            Err(LedgerError::InvalidAccountDetails(_))
        ));

        let mut blank_name = details;
        blank_name.account_name = String::new();
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_pending_cannot_settle_directly() {
        let mut req = request();
        let err = req.transition(WithdrawalStatus::Settled, 2000).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidTransition {
                id: req.id,
                from: WithdrawalStatus::Pending,
                to: WithdrawalStatus::Settled,
            }
        );
        // Failed transition leaves the request untouched
        assert_eq!(req.status, WithdrawalStatus::Pending);
        assert_eq!(req.decided_at, None);
    }
}
