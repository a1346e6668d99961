//! # API-Call Accountant
//!
//! Thread-safe per-(service, endpoint) call counters with durable daily
//! rollover. The instrumented transport is the only caller of
//! [`ApiCallTracker::increment`]; everything else reads snapshots.
//!
//! Durable writes always flush the cumulative in-memory total, so they are
//! idempotent and last-writer-wins within a day. A failed write on the
//! increment path is logged and swallowed: the in-memory count stays
//! correct and the midnight rollover re-flushes it.
//!
//! The counters belong to a calendar date, carried under the same mutex.
//! The rollover task fires just after midnight, so the flush targets the
//! day the counts accumulated on, not the day the flush runs on.

use chrono::NaiveDate;
use lib_core::error::Result;
use lib_core::model::store::ApiStatRepository;
use lib_core::DbPool;
use lib_providers::transport::CallRecorder;
use lib_utils::time::today_utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often the background task logs a counter snapshot.
pub const SNAPSHOT_LOG_INTERVAL: Duration = Duration::from_secs(5 * 60);

struct TrackerState {
    /// The calendar date the counters belong to.
    date: NaiveDate,
    counts: HashMap<String, HashMap<String, u64>>,
}

/// Per-service, per-endpoint daily call counters.
pub struct ApiCallTracker {
    state: Mutex<TrackerState>,
    pool: DbPool,
}

impl ApiCallTracker {
    pub fn new(pool: DbPool) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                date: today_utc(),
                counts: HashMap::new(),
            }),
            pool,
        }
    }

    /// Record one call to `(service, endpoint)`.
    ///
    /// The in-memory bump happens under the lock; the durable upsert of the
    /// new total is scheduled on its own task so callers never wait on the
    /// store. Store failures are logged only.
    pub fn increment(&self, service: &str, endpoint: &str) {
        let (date, total) = {
            let mut state = self.state.lock().expect("stats lock poisoned");
            let date = state.date;
            let count = state
                .counts
                .entry(service.to_string())
                .or_default()
                .entry(endpoint.to_string())
                .or_insert(0);
            *count += 1;
            (date, *count)
        };

        let pool = self.pool.clone();
        let service = service.to_string();
        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            if let Err(err) =
                ApiStatRepository::upsert(&pool, &service, &endpoint, date, total as i64).await
            {
                warn!(service = %service, endpoint = %endpoint, error = %err, "failed to persist api stat");
            }
        });
    }

    /// Deep copy of the current counters.
    pub fn get_stats(&self) -> HashMap<String, HashMap<String, u64>> {
        self.state.lock().expect("stats lock poisoned").counts.clone()
    }

    /// Seed the in-memory map from today's persisted rows.
    ///
    /// A store error surfaces without touching the map. Zero rows also leave
    /// the map untouched: counts accumulated since the process started are
    /// kept across a mid-day restart.
    pub async fn load_for_today(&self) -> Result<()> {
        let today = today_utc();
        let rows = ApiStatRepository::list_for_date(&self.pool, today).await?;

        let mut state = self.state.lock().expect("stats lock poisoned");
        state.date = today;
        for row in rows {
            state
                .counts
                .entry(row.service_name)
                .or_default()
                .insert(row.endpoint_name, row.count.max(0) as u64);
        }

        Ok(())
    }

    /// Flush every non-zero counter to its owning date and clear the map.
    ///
    /// Flushing continues past per-row errors; the first error encountered
    /// is returned after the remaining rows were attempted.
    pub async fn reset_stats(&self) -> Result<()> {
        let (date, snapshot) = {
            let mut state = self.state.lock().expect("stats lock poisoned");
            let date = state.date;
            state.date = today_utc();
            (date, std::mem::take(&mut state.counts))
        };

        let mut first_error = None;

        for (service, endpoints) in snapshot {
            for (endpoint, count) in endpoints {
                if count == 0 {
                    continue;
                }
                if let Err(err) =
                    ApiStatRepository::upsert(&self.pool, &service, &endpoint, date, count as i64)
                        .await
                {
                    warn!(service = %service, endpoint = %endpoint, error = %err, "failed to flush api stat");
                    if first_error.is_none() {
                        first_error = Some(err.into());
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Spawn the snapshot logger and the midnight rollover task.
    ///
    /// Both terminate when the shutdown channel fires. Shutdown does not
    /// imply a final flush; teardown calls [`reset_stats`](Self::reset_stats)
    /// explicitly.
    pub fn spawn_background(
        self: std::sync::Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let tracker = self.clone();
        let mut snapshot_shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SNAPSHOT_LOG_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick fires immediately; skip it so startup stays quiet
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        info!(stats = ?tracker.get_stats(), "api call counters");
                    }
                    _ = snapshot_shutdown.changed() => break,
                }
            }
        }));

        let tracker = self;
        let mut rollover_shutdown = shutdown;
        handles.push(tokio::spawn(async move {
            loop {
                let wait = duration_until_next_utc_midnight();
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        info!("rolling over daily api stats");
                        if let Err(err) = tracker.reset_stats().await {
                            error!(error = %err, "daily stats flush failed");
                        }
                        if let Err(err) = tracker.load_for_today().await {
                            error!(error = %err, "reloading today's stats failed");
                        }
                    }
                    _ = rollover_shutdown.changed() => break,
                }
            }
        }));

        handles
    }

    #[cfg(test)]
    fn force_date(&self, date: NaiveDate) {
        self.state.lock().expect("stats lock poisoned").date = date;
    }
}

impl CallRecorder for ApiCallTracker {
    fn record(&self, service: &str, endpoint: &str) {
        self.increment(service, endpoint);
    }
}

/// Time until the next UTC midnight.
pub fn duration_until_next_utc_midnight() -> Duration {
    let now = chrono::Utc::now();
    let next_midnight = now
        .date_naive()
        .succ_opt()
        .expect("calendar does not end tomorrow")
        .and_hms_opt(0, 0, 0)
        .expect("midnight exists")
        .and_utc();

    (next_midnight - now)
        .to_std()
        .unwrap_or(Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_core::model::store::{create_pool, init_schema};

    async fn setup_tracker() -> (ApiCallTracker, DbPool) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        (ApiCallTracker::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn increments_are_counted_per_endpoint() {
        let (tracker, _pool) = setup_tracker().await;

        tracker.increment("market-data", "/defi/history_price");
        tracker.increment("market-data", "/defi/history_price");
        tracker.increment("market-data", "/defi/token_trending");
        tracker.increment("aggregator", "/price");

        let stats = tracker.get_stats();
        assert_eq!(stats["market-data"]["/defi/history_price"], 2);
        assert_eq!(stats["market-data"]["/defi/token_trending"], 1);
        assert_eq!(stats["aggregator"]["/price"], 1);
    }

    #[tokio::test]
    async fn get_stats_returns_a_deep_copy() {
        let (tracker, _pool) = setup_tracker().await;
        tracker.increment("aggregator", "/price");

        let mut snapshot = tracker.get_stats();
        snapshot
            .get_mut("aggregator")
            .unwrap()
            .insert("/price".to_string(), 99);

        assert_eq!(tracker.get_stats()["aggregator"]["/price"], 1);
    }

    #[tokio::test]
    async fn reset_flushes_counts_and_clears_the_map() {
        let (tracker, pool) = setup_tracker().await;

        tracker.increment("market-data", "/defi/token_trending");
        tracker.increment("market-data", "/defi/token_trending");
        tracker.increment("market-data", "/defi/token_trending");

        tracker.reset_stats().await.unwrap();

        assert!(tracker.get_stats().is_empty());
        let row = ApiStatRepository::get(&pool, "market-data", "/defi/token_trending", today_utc())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.count, 3);
    }

    #[tokio::test]
    async fn rollover_books_counts_on_their_owning_date() {
        let (tracker, pool) = setup_tracker().await;
        let yesterday = today_utc().pred_opt().unwrap();

        // counts accumulated before midnight belong to yesterday
        tracker.force_date(yesterday);
        tracker.increment("market-data", "/x");
        tracker.increment("market-data", "/x");
        tracker.increment("market-data", "/x");

        // what the midnight task runs: flush, then reload
        tracker.reset_stats().await.unwrap();
        tracker.load_for_today().await.unwrap();

        let row = ApiStatRepository::get(&pool, "market-data", "/x", yesterday)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.count, 3);

        // today has no rows yet, so the new day starts from zero
        assert!(tracker.get_stats().is_empty());
    }

    #[tokio::test]
    async fn load_for_today_seeds_from_persisted_rows() {
        let (tracker, pool) = setup_tracker().await;

        ApiStatRepository::upsert(&pool, "chain-rpc", "getBalance", today_utc(), 41)
            .await
            .unwrap();

        tracker.load_for_today().await.unwrap();
        assert_eq!(tracker.get_stats()["chain-rpc"]["getBalance"], 41);

        // counting continues from the seeded value
        tracker.increment("chain-rpc", "getBalance");
        assert_eq!(tracker.get_stats()["chain-rpc"]["getBalance"], 42);
    }

    #[tokio::test]
    async fn load_for_today_with_no_rows_keeps_accumulated_counts() {
        let (tracker, _pool) = setup_tracker().await;

        tracker.increment("aggregator", "/price");
        tracker.load_for_today().await.unwrap();

        // zero rows in the store must not wipe in-memory state
        assert_eq!(tracker.get_stats()["aggregator"]["/price"], 1);
    }

    #[test]
    fn next_midnight_is_within_a_day() {
        let wait = duration_until_next_utc_midnight();
        assert!(wait <= Duration::from_secs(24 * 3600));
        assert!(wait > Duration::ZERO);
    }
}
