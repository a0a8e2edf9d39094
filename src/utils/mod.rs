//! # Utilities Module
//!
//! Small helpers shared across the progression engine and the
//! offline ticket cache.

use chrono::{DateTime, NaiveDate, Utc};

/// Current moment as epoch milliseconds.
///
/// Activity timestamps (vibe ratings, achievement unlocks, last
/// activity) are stored as epoch-ms integers so they round-trip
/// against records written by the mobile clients.
pub fn epoch_ms_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whole days elapsed from `from` to `to`.
///
/// Negative when `to` is before `from` (a device clock that moved
/// backwards); callers treat that the same as a multi-day gap.
pub fn day_delta(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Round to two decimal places.
///
/// Used for the average-rating rollup, which is displayed with
/// two decimals and stored the same way.
///
/// ## Examples
///
/// ```rust
/// use vibepass_core::utils::round2;
/// assert_eq!(round2(4.666666), 4.67);
/// assert_eq!(round2(3.0), 3.0);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a timestamp as ISO 8601.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}
