// Time types used across the ledger
//
// Calendar days are the quota and idempotency boundary: every node handling
// requests for a user must agree on what "today" is, so the day is always
// derived from the single configured UTC offset, never from local time zones.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::MILLIS_PER_DAY;

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

#[inline]
pub fn get_current_time() -> Duration {
    let start = SystemTime::now();

    start
        .duration_since(UNIX_EPOCH)
        .expect("Incorrect time returned from get_current_time")
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Return timestamp in milliseconds
// We cast it to u64 as we have plenty of time before it overflows (year 584,942,417 AD)
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}

/// One calendar day of the ledger, counted in whole days since the Unix epoch
/// shifted by the deployment's UTC offset.
///
/// Quota counters and video-watch idempotency keys are scoped by this value,
/// so two requests in the same local day always resolve to the same `LedgerDay`
/// no matter which node processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerDay(pub u32);

impl LedgerDay {
    /// Day containing the given wall-clock timestamp under the given offset.
    pub fn from_millis(millis: TimestampMillis, utc_offset_minutes: i32) -> Self {
        let offset_ms = utc_offset_minutes as i64 * 60_000;
        // Clamp below epoch to day 0 rather than wrapping
        let shifted = (millis as i64).saturating_add(offset_ms).max(0) as u64;
        Self((shifted / MILLIS_PER_DAY) as u32)
    }

    /// Current day under the given offset.
    pub fn today(utc_offset_minutes: i32) -> Self {
        Self::from_millis(get_current_time_in_millis(), utc_offset_minutes)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let days = date.signed_duration_since(epoch_date()).num_days().max(0);
        Self(days as u32)
    }

    pub fn as_date(&self) -> NaiveDate {
        epoch_date()
            .checked_add_days(Days::new(self.0 as u64))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for LedgerDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_date().format("%Y-%m-%d"))
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date is valid")
}
