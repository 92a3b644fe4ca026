// Fixed-point cash amounts
//
// All balances are kept in u64 minor units (pesewas, 2 decimals) and every
// mutation goes through checked arithmetic. Floats never touch money: the
// wire format is a decimal string ("12.34") on both requests and responses,
// matching what the mobile clients already send.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{BPS_DENOMINATOR, CASH_DECIMALS, CASH_UNIT};

/// A non-negative cash amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount must contain only digits and an optional decimal point")]
    InvalidDigit,

    #[error("Amount has more than {max} decimal places")]
    TooManyDecimals { max: u8 },

    #[error("Amount does not fit in the ledger's range")]
    Overflow,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[inline]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    #[inline]
    pub const fn as_minor(&self) -> u64 {
        self.0
    }

    /// Whole currency units, e.g. `Amount::from_whole(50)` is "50.00".
    pub const fn from_whole(units: u64) -> Self {
        Self(units * CASH_UNIT)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Basis-point share of this amount, truncated to minor units.
    pub fn mul_bps(self, bps: u16) -> Amount {
        // Use u128 to prevent overflow
        Amount(((self.0 as u128 * bps as u128) / BPS_DENOMINATOR as u128) as u64)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / CASH_UNIT;
        let frac = self.0 % CASH_UNIT;
        write!(f, "{}.{:0width$}", whole, frac, width = CASH_DECIMALS as usize)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountParseError::Empty);
        }
        if frac.len() > CASH_DECIMALS as usize {
            return Err(AmountParseError::TooManyDecimals {
                max: CASH_DECIMALS,
            });
        }
        // Digits only: rejects signs, exponents and embedded whitespace
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountParseError::InvalidDigit);
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountParseError::Overflow)?
        };
        let mut minor = whole
            .checked_mul(CASH_UNIT)
            .ok_or(AmountParseError::Overflow)?;
        if !frac.is_empty() {
            // "5" after the point means 50 minor units, not 5
            let mut frac_minor: u64 = frac.parse().map_err(|_| AmountParseError::Overflow)?;
            for _ in frac.len()..CASH_DECIMALS as usize {
                frac_minor *= 10;
            }
            minor = minor
                .checked_add(frac_minor)
                .ok_or(AmountParseError::Overflow)?;
        }

        Ok(Amount(minor))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
