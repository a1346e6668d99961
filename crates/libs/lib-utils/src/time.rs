//! # Time Utilities
//!
//! Utilities for time handling and bucket quantization using chrono.

use chrono::{DateTime, NaiveDate, Utc};

/// Get current UTC time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Get the current Unix timestamp in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Get today's UTC calendar date.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Round a Unix timestamp down to the nearest multiple of `step` seconds.
///
/// A zero step returns the timestamp unchanged; a negative step is treated
/// as one minute. Negative timestamps round toward negative infinity so the
/// result is always a bucket boundary at or before `t`.
pub fn round_down(t: i64, step: i64) -> i64 {
    let step = match step {
        0 => return t,
        s if s < 0 => 60,
        s => s,
    };
    t.div_euclid(step) * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_down_quantizes_to_bucket() {
        assert_eq!(round_down(1_700_000_123, 60), 1_700_000_100);
        assert_eq!(round_down(1_700_000_100, 60), 1_700_000_100);
        assert_eq!(round_down(59, 60), 0);
    }

    #[test]
    fn round_down_zero_step_is_identity() {
        assert_eq!(round_down(1_700_000_123, 0), 1_700_000_123);
    }

    #[test]
    fn round_down_negative_step_uses_one_minute() {
        assert_eq!(round_down(1_700_000_123, -5), round_down(1_700_000_123, 60));
    }

    #[test]
    fn round_down_is_idempotent() {
        for step in [0, 60, 300, 900, 3600, 14400] {
            let rounded = round_down(1_700_000_123, step);
            assert_eq!(round_down(rounded, step), rounded);
        }
    }
}
