//! # Price-History Cache
//!
//! Timeframe-aware cache of historical price series, keyed by
//! `(mint, timeframe)`. The query window is deliberately not part of the
//! key: windows are quantized to the timeframe's rounding step before any
//! provider call, so every caller inside the same step observes the same
//! series and shares one entry.
//!
//! Entries expire after the timeframe's rounding step, which bounds
//! staleness to one provider candle.

use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// One point of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub unix_time: i64,
    pub value: f64,
}

/// A cached historical price series.
///
/// Points are sorted ascending by `unix_time`. `time_from`/`time_to` are the
/// rounded window that produced the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistorySeries {
    pub items: Vec<PricePoint>,
    pub success: bool,
    pub time_from: i64,
    pub time_to: i64,
}

struct CachedSeries {
    series: PriceHistorySeries,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedSeries {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Thread-safe price-history cache with per-timeframe TTLs.
#[derive(Default)]
pub struct PriceHistoryCache {
    entries: Mutex<HashMap<(String, &'static str), CachedSeries>>,
}

impl PriceHistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached series for `(mint, timeframe)` if present and
    /// unexpired. Expired entries are dropped on the way out.
    pub fn get(&self, mint: &str, timeframe: Timeframe) -> Option<PriceHistorySeries> {
        let key = (mint.to_string(), timeframe.label());
        let mut entries = self.entries.lock().expect("history cache lock poisoned");

        match entries.get(&key) {
            Some(cached) if cached.is_expired() => {}
            Some(cached) => return Some(cached.series.clone()),
            None => return None,
        }

        debug!(mint, timeframe = %timeframe, "history cache entry expired");
        entries.remove(&key);
        None
    }

    /// Store a series with TTL equal to the timeframe's rounding step.
    pub fn set(&self, mint: &str, timeframe: Timeframe, series: PriceHistorySeries) {
        self.set_with_ttl(mint, timeframe, series, timeframe.rounding_step());
    }

    /// Store a series with an explicit TTL.
    pub fn set_with_ttl(
        &self,
        mint: &str,
        timeframe: Timeframe,
        series: PriceHistorySeries,
        ttl: Duration,
    ) {
        let key = (mint.to_string(), timeframe.label());
        let mut entries = self.entries.lock().expect("history cache lock poisoned");
        entries.insert(
            key,
            CachedSeries {
                series,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("history cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> PriceHistorySeries {
        PriceHistorySeries {
            items: vec![
                PricePoint {
                    unix_time: 100,
                    value: 1.0,
                },
                PricePoint {
                    unix_time: 160,
                    value: 1.1,
                },
            ],
            success: true,
            time_from: 100,
            time_to: 160,
        }
    }

    #[test]
    fn set_then_get_returns_the_series() {
        let cache = PriceHistoryCache::new();
        cache.set("mintA", Timeframe::OneHour, sample_series());

        let series = cache.get("mintA", Timeframe::OneHour).unwrap();
        assert_eq!(series, sample_series());
    }

    #[test]
    fn entries_are_independent_per_timeframe() {
        let cache = PriceHistoryCache::new();
        cache.set("mintA", Timeframe::OneHour, sample_series());

        assert!(cache.get("mintA", Timeframe::OneDay).is_none());
        assert!(cache.get("mintB", Timeframe::OneHour).is_none());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = PriceHistoryCache::new();
        cache.set_with_ttl(
            "mintA",
            Timeframe::OneHour,
            sample_series(),
            Duration::from_millis(10),
        );

        assert!(cache.get("mintA", Timeframe::OneHour).is_some());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("mintA", Timeframe::OneHour).is_none());
        assert!(cache.is_empty());
    }
}
