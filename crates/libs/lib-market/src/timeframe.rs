//! # Timeframes
//!
//! The named duration/granularity pairs governing price-history queries.
//! Each timeframe carries three constants: the granularity token passed to
//! the market-data provider, how far back a query spans when no explicit
//! start is given, and the rounding step used to quantize query windows.
//!
//! The rounding step doubles as the cache TTL for that timeframe: two
//! callers inside the same step observe the same window and share a cache
//! entry, and staleness is bounded by one step.

use lib_utils::time::round_down;
use std::time::Duration;

/// Timeframe for price-history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    OneHour,
    FourHours,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
        Timeframe::OneWeek,
        Timeframe::OneMonth,
    ];

    /// Parse a timeframe label as it appears on the wire.
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_uppercase().as_str() {
            "1H" => Some(Timeframe::OneHour),
            "4H" => Some(Timeframe::FourHours),
            "1D" => Some(Timeframe::OneDay),
            "1W" => Some(Timeframe::OneWeek),
            "1M" => Some(Timeframe::OneMonth),
            _ => None,
        }
    }

    /// Get the timeframe label.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1H",
            Timeframe::FourHours => "4H",
            Timeframe::OneDay => "1D",
            Timeframe::OneWeek => "1W",
            Timeframe::OneMonth => "1M",
        }
    }

    /// Granularity token passed to the market-data provider.
    pub fn provider_granularity(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1m",
            Timeframe::FourHours => "5m",
            Timeframe::OneDay => "15m",
            Timeframe::OneWeek => "1H",
            Timeframe::OneMonth => "4H",
        }
    }

    /// How far back a query spans when the caller gives no explicit start.
    pub fn default_view_duration(&self) -> Duration {
        match self {
            Timeframe::OneHour => Duration::from_secs(3_600),
            Timeframe::FourHours => Duration::from_secs(4 * 3_600),
            Timeframe::OneDay => Duration::from_secs(24 * 3_600),
            Timeframe::OneWeek => Duration::from_secs(7 * 24 * 3_600),
            Timeframe::OneMonth => Duration::from_secs(30 * 24 * 3_600),
        }
    }

    /// Quantization unit for query windows, equal to the provider's own
    /// candle width for this timeframe. Also the cache TTL.
    pub fn rounding_step(&self) -> Duration {
        match self {
            Timeframe::OneHour => Duration::from_secs(60),
            Timeframe::FourHours => Duration::from_secs(300),
            Timeframe::OneDay => Duration::from_secs(900),
            Timeframe::OneWeek => Duration::from_secs(3_600),
            Timeframe::OneMonth => Duration::from_secs(14_400),
        }
    }

    /// Compute the rounded `(time_from, time_to)` window for a reference
    /// timestamp.
    pub fn query_window(&self, reference: i64) -> (i64, i64) {
        rounded_window(
            reference,
            self.default_view_duration().as_secs() as i64,
            self.rounding_step().as_secs() as i64,
        )
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Quantize a query window to step boundaries.
///
/// `time_to` is the reference rounded down; `time_from` is the reference
/// minus the view duration, rounded down. A zero step leaves both ends
/// unrounded, a negative step is treated as one minute, and a window
/// narrower than one step is widened backwards so the provider always
/// receives at least one full step.
pub fn rounded_window(reference: i64, view_duration: i64, step: i64) -> (i64, i64) {
    let time_to = round_down(reference, step);
    let mut time_from = round_down(reference - view_duration, step);

    let step = match step {
        0 => return (time_from, time_to),
        s if s < 0 => 60,
        s => s,
    };
    if time_to - time_from < step {
        time_from -= step;
    }

    (time_from, time_to)
}
