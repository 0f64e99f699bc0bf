//! Conversions between integer counters and the float domain that rate and
//! latency math runs in.
use std::time::Duration;

/// Milliseconds in a duration, keeping sub-millisecond precision.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "Latencies are bucketed and displayed as float milliseconds"
)]
pub const fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Widen a counter; exact up to 2^53.
#[must_use]
pub const fn count_to_f64(value: u64) -> f64 {
    value as f64
}

/// Truncate toward zero. Saturates at the integer bounds and maps NaN to 0.
#[must_use]
pub const fn f64_to_count(value: f64) -> u64 {
    value as u64
}

#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    count_to_f64(u64::try_from(value).unwrap_or(u64::MAX))
}

#[must_use]
pub fn f64_to_usize(value: f64) -> usize {
    usize::try_from(f64_to_count(value)).unwrap_or(usize::MAX)
}
