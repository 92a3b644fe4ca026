use thiserror::Error;

use crate::{
    ids::{InvestmentId, ReservationId, UserId, WithdrawalId},
    investment::InvestmentStatus,
    money::{Amount, AmountParseError},
    time::LedgerDay,
    withdrawal::{ReservationState, WithdrawalStatus},
};

/// Every failure the ledger can surface to a caller.
///
/// Idempotent replays (an already-credited reward, an already-released
/// reservation) are not errors: operations report them through their outcome
/// enums so callers can retry without special-casing. `Storage` is the one
/// transient class; callers may retry it with bounded attempts, everything
/// else is permanent until state changes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Investment {0} not found")]
    InvestmentNotFound(InvestmentId),

    #[error("Withdrawal {0} not found")]
    WithdrawalNotFound(WithdrawalId),

    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),

    #[error("Investment {id} is {status}, operation requires an active investment")]
    InvestmentNotActive {
        id: InvestmentId,
        status: InvestmentStatus,
    },

    #[error("Withdrawal {id} is {from}, cannot transition to {to}")]
    InvalidTransition {
        id: WithdrawalId,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    },

    #[error("Investment {id} is {from}, cannot transition to {to}")]
    InvalidInvestmentTransition {
        id: InvestmentId,
        from: InvestmentStatus,
        to: InvestmentStatus,
    },

    #[error("Reservation {id} is already {state}")]
    ReservationClosed {
        id: ReservationId,
        state: ReservationState,
    },

    #[error("Daily quota of {limit} videos reached for {day}")]
    QuotaExceeded { limit: u32, day: LedgerDay },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Amount,
        available: Amount,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountParseError),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Invalid account details: {0}")]
    InvalidAccountDetails(String),

    #[error("Unknown plan level {0}")]
    UnknownPlanLevel(u8),

    #[error("Investment amount {amount} is below the plan minimum {minimum}")]
    BelowPlanMinimum { amount: Amount, minimum: Amount },

    #[error("User has already bound a different referrer")]
    AlreadyBound,

    #[error("Cannot set self as referrer")]
    SelfReferral,

    #[error("User {0} has no active investment")]
    NoActiveInvestment(UserId),

    #[error("Balance overflow on investment {0}")]
    BalanceOverflow(InvestmentId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Wrap a backend fault. The message is kept verbatim for the logs; the
    /// HTTP layer never forwards it to callers.
    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        Self::Storage(err.to_string())
    }

    /// True for the transient class callers may retry with bounded attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
