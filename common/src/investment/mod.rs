// Investment records
//
// An investment is the unit every balance hangs off: rewards credit into it,
// withdrawals debit out of it. `available_earnings` is derived, never stored,
// so the balance invariant cannot drift out of sync with its parts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::{LedgerError, LedgerResult},
    ids::{InvestmentId, UserId},
    money::Amount,
    time::TimestampMillis,
};

/// Lifecycle of an investment. There is no deletion, only `Closed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    /// Accruing rewards, withdrawals allowed.
    Active,
    /// Term ended. No further accrual and no new withdrawals; reservations
    /// already in flight still settle or release.
    Matured,
    /// Retired by an operator. Terminal.
    Closed,
}

impl InvestmentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn can_transition_to(self, to: InvestmentStatus) -> bool {
        use InvestmentStatus::*;
        matches!((self, to), (Active, Matured) | (Active, Closed) | (Matured, Closed))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Matured => "matured",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A funded plan instance accruing earnings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Investment {
    pub id: InvestmentId,

    /// Owning user
    pub user_id: UserId,

    /// Plan tier, decides the daily video cap
    pub plan_level: u8,

    /// Amount paid to activate, fixed for the life of the investment
    pub amount_invested: Amount,

    /// Lifetime credited rewards, monotonically non-decreasing
    pub total_earnings: Amount,

    /// Permanently debited by settled withdrawals
    pub withdrawn_total: Amount,

    /// Held by open withdrawal reservations
    pub reserved_total: Amount,

    pub status: InvestmentStatus,

    pub activated_at: TimestampMillis,

    pub updated_at: TimestampMillis,
}

impl Investment {
    pub fn new(
        id: InvestmentId,
        user_id: UserId,
        plan_level: u8,
        amount_invested: Amount,
        now: TimestampMillis,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_level,
            amount_invested,
            total_earnings: Amount::ZERO,
            withdrawn_total: Amount::ZERO,
            reserved_total: Amount::ZERO,
            status: InvestmentStatus::Active,
            activated_at: now,
            updated_at: now,
        }
    }

    /// Earnings not yet withdrawn or reserved:
    /// `total_earnings - withdrawn_total - reserved_total`.
    pub fn available_earnings(&self) -> Amount {
        self.total_earnings
            .saturating_sub(self.withdrawn_total)
            .saturating_sub(self.reserved_total)
    }

    /// Add a reward to the balance.
    pub fn credit(&mut self, amount: Amount, now: TimestampMillis) -> LedgerResult<()> {
        self.total_earnings = self
            .total_earnings
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(self.id))?;
        self.updated_at = now;
        Ok(())
    }

    /// Place a hold against available earnings.
    pub fn reserve(&mut self, amount: Amount, now: TimestampMillis) -> LedgerResult<()> {
        let available = self.available_earnings();
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.reserved_total = self
            .reserved_total
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(self.id))?;
        self.updated_at = now;
        Ok(())
    }

    /// Convert a hold into a permanent debit.
    pub fn settle_hold(&mut self, amount: Amount, now: TimestampMillis) -> LedgerResult<()> {
        self.reserved_total = self
            .reserved_total
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::storage(format!("hold underflow on investment {}", self.id)))?;
        self.withdrawn_total = self
            .withdrawn_total
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(self.id))?;
        self.updated_at = now;
        Ok(())
    }

    /// Give a hold back to available earnings.
    pub fn release_hold(&mut self, amount: Amount, now: TimestampMillis) -> LedgerResult<()> {
        self.reserved_total = self
            .reserved_total
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::storage(format!("hold underflow on investment {}", self.id)))?;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Id;

    fn investment() -> Investment {
        Investment::new(
            Id::random(),
            UserId::from("user-1"),
            1,
            Amount::from_whole(50),
            1000,
        )
    }

    #[test]
    fn test_new_investment_has_no_earnings() {
        let inv = investment();
        assert_eq!(inv.total_earnings, Amount::ZERO);
        assert_eq!(inv.available_earnings(), Amount::ZERO);
        assert!(inv.status.is_active());
    }

    #[test]
    fn test_credit_and_reserve_flow() {
        let mut inv = investment();
        inv.credit(Amount::from_whole(100), 2000).expect("test");
        assert_eq!(inv.available_earnings(), Amount::from_whole(100));

        inv.reserve(Amount::from_whole(60), 3000).expect("test");
        assert_eq!(inv.available_earnings(), Amount::from_whole(40));
        assert_eq!(inv.total_earnings, Amount::from_whole(100));

        // Settling converts the hold into a permanent debit
        inv.settle_hold(Amount::from_whole(60), 4000).expect("test");
        assert_eq!(inv.available_earnings(), Amount::from_whole(40));
        assert_eq!(inv.withdrawn_total, Amount::from_whole(60));
        assert_eq!(inv.reserved_total, Amount::ZERO);
    }

    #[test]
    fn test_release_restores_available() {
        let mut inv = investment();
        inv.credit(Amount::from_whole(100), 2000).expect("test");
        inv.reserve(Amount::from_whole(60), 3000).expect("test");
        inv.release_hold(Amount::from_whole(60), 4000).expect("test");
        assert_eq!(inv.available_earnings(), Amount::from_whole(100));
        assert_eq!(inv.withdrawn_total, Amount::ZERO);
    }

    #[test]
    fn test_reserve_beyond_available_fails() {
        let mut inv = investment();
        inv.credit(Amount::from_whole(10), 2000).expect("test");
        let err = inv.reserve(Amount::from_whole(11), 3000).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                requested: Amount::from_whole(11),
                available: Amount::from_whole(10),
            }
        );
        // Failed reserve leaves the balance untouched
        assert_eq!(inv.available_earnings(), Amount::from_whole(10));
    }

    #[test]
    fn test_status_transitions() {
        use InvestmentStatus::*;
        assert!(Active.can_transition_to(Matured));
        assert!(Active.can_transition_to(Closed));
        assert!(Matured.can_transition_to(Closed));
        assert!(!Matured.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Matured));
    }
}
