//! Expiration arithmetic for renewable seats.
//!
//! All durations are whole days of exactly 86 400 seconds; calendar months
//! are not used, a "month" cadence is simply 30 days.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SeatError;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Returns `base + days * 86400s`, or a validation error when the result is
/// not a representable time.
pub fn add_days(base: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, SeatError> {
    days.checked_mul(SECONDS_PER_DAY)
        .and_then(Duration::try_seconds)
        .and_then(|delta| base.checked_add_signed(delta))
        .ok_or_else(|| SeatError::Validation(format!("{days} days from {base} is out of range")))
}

/// New expiry after renewing by `days`.
///
/// A seat that has not expired yet keeps its remaining time: the extension is
/// added to `current_expiry`. An expired seat restarts from `now`. An expiry
/// exactly equal to `now` still counts as live.
pub fn compute_renewal(current_expiry: DateTime<Utc>, days: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, SeatError> {
    if current_expiry >= now {
        add_days(current_expiry, days)
    } else {
        add_days(now, days)
    }
}

/// Whole days left until `expiry`, rounded up.
///
/// Anything already past (or exactly at) `now` yields zero or a negative
/// number.
pub fn remaining_days(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expiry - now).num_milliseconds();
    let per_day = SECONDS_PER_DAY * 1000;
    // ceil for signed integers
    let q = millis / per_day;
    if millis % per_day > 0 { q + 1 } else { q }
}

/// Display tier used to highlight rows by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExpiryTier {
    Expired,
    /// Three days or fewer remaining.
    Critical,
    /// Seven days or fewer remaining.
    Warning,
    Healthy,
}

impl ExpiryTier {
    pub fn classify(expiry: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if expiry <= now {
            return ExpiryTier::Expired;
        }
        match remaining_days(expiry, now) {
            ..=3 => ExpiryTier::Critical,
            4..=7 => ExpiryTier::Warning,
            _ => ExpiryTier::Healthy,
        }
    }
}
