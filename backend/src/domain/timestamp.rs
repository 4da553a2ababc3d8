//! Timestamp precision shared by every aggregate and adapter.
//!
//! PostgreSQL `TIMESTAMPTZ` keeps microseconds, so aggregates hold times at
//! that precision and a saved aggregate compares equal to its re-read copy.

use chrono::{DateTime, SubsecRound, Utc};

/// Fractional-second digits kept on stored times.
pub const STORED_SUBSEC_DIGITS: u16 = 6;

/// Truncate `at` to microseconds.
pub fn stored_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(STORED_SUBSEC_DIGITS)
}
