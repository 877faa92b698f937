//! Time utilities for agent-trust.
//!
//! Trust timestamps have one-second resolution and travel on the wire as
//! integer seconds since the Unix epoch. Durations are configured in
//! (possibly fractional) days.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Largest day count converted exactly; anything beyond saturates.
const MAX_DAYS: f64 = 100_000_000.0;

/// Return the current time truncated to whole seconds.
pub fn now() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

/// Drop the sub-second part of a timestamp.
pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Encode a timestamp as integer seconds since the Unix epoch.
pub fn to_epoch_seconds(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

/// Decode integer seconds since the Unix epoch.
///
/// Returns `None` when the value lies outside chrono's representable range.
pub fn from_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Convert a day count into a `TimeDelta` with millisecond precision.
pub fn days(days: f64) -> TimeDelta {
    let millis = (days.clamp(-MAX_DAYS, MAX_DAYS) * MILLIS_PER_DAY).round() as i64;
    TimeDelta::try_milliseconds(millis).unwrap_or_else(TimeDelta::zero)
}

/// Convert a day count into whole seconds, as used for transport max-age.
pub fn days_to_seconds(days: f64) -> i64 {
    (days.clamp(0.0, MAX_DAYS) * SECONDS_PER_DAY) as i64
}

/// Add a delta, saturating at the representable minimum/maximum instant.
pub fn add_saturating(at: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Format a timestamp as an RFC 3339 string.
pub fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
