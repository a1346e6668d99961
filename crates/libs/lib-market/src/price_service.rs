//! # Price Read Service
//!
//! Query-time composition over the history cache and the providers:
//! price-history reads consult the cache first and fill it on a miss;
//! spot-price batches go straight to the aggregator because they are
//! meant to be fresh.
//!
//! Debug-flagged request contexts get deterministic synthesized data and
//! never touch the cache or the providers.

use crate::history::{PriceHistoryCache, PriceHistorySeries, PricePoint};
use crate::map_provider_error;
use crate::timeframe::Timeframe;
use lib_core::error::{AppError, Result};
use lib_core::Ctx;
use lib_providers::aggregator::AggregatorClient;
use lib_providers::market_data::MarketDataClient;
use lib_utils::time::unix_now;
use lib_utils::validation::validate_not_empty;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Price reads over cache and providers.
pub struct PriceService {
    history: Arc<PriceHistoryCache>,
    market_data: Arc<MarketDataClient>,
    aggregator: Arc<AggregatorClient>,
}

impl PriceService {
    pub fn new(
        history: Arc<PriceHistoryCache>,
        market_data: Arc<MarketDataClient>,
        aggregator: Arc<AggregatorClient>,
    ) -> Self {
        Self {
            history,
            market_data,
            aggregator,
        }
    }

    /// Fetch the price history for a mint over a timeframe.
    ///
    /// The query window is quantized to the timeframe's rounding step, so
    /// every caller inside the same step shares one provider call and one
    /// cache entry. A provider failure surfaces as an upstream error and
    /// never populates the cache.
    pub async fn get_price_history(
        &self,
        ctx: &Ctx,
        mint: &str,
        timeframe: &str,
        reference_time: Option<i64>,
    ) -> Result<PriceHistorySeries> {
        validate_not_empty(mint, "mint")
            .map_err(|err| AppError::InvalidArgument(err.to_string()))?;

        let timeframe = Timeframe::parse(timeframe).ok_or_else(|| {
            AppError::InvalidArgument(format!("unknown timeframe: {timeframe}"))
        })?;

        let reference = reference_time.unwrap_or_else(unix_now);
        let (time_from, time_to) = timeframe.query_window(reference);

        if ctx.debug() {
            return Ok(synthesize_series(
                ctx.seed(),
                mint,
                timeframe,
                time_from,
                time_to,
            ));
        }

        if let Some(series) = self.history.get(mint, timeframe) {
            debug!(mint, timeframe = %timeframe, "price history cache hit");
            return Ok(series);
        }

        let fetched = self
            .market_data
            .history_price(mint, timeframe.provider_granularity(), time_from, time_to)
            .await
            .map_err(map_provider_error)?;

        let series = PriceHistorySeries {
            items: fetched
                .items
                .into_iter()
                .map(|point| PricePoint {
                    unix_time: point.unix_time,
                    value: point.value,
                })
                .collect(),
            success: fetched.success,
            time_from,
            time_to,
        };

        self.history.set(mint, timeframe, series.clone());
        Ok(series)
    }

    /// Fetch fresh spot prices for a batch of mints.
    ///
    /// No caching layer: staleness here would show up directly in wallet
    /// balances. An empty input returns an empty map without any upstream
    /// call.
    pub async fn get_prices(&self, ctx: &Ctx, mints: &[String]) -> Result<HashMap<String, f64>> {
        if mints.is_empty() {
            return Ok(HashMap::new());
        }

        if ctx.debug() {
            return Ok(mints
                .iter()
                .map(|mint| (mint.clone(), synthesize_price(ctx.seed(), mint)))
                .collect());
        }

        self.aggregator
            .prices(mints)
            .await
            .map_err(map_provider_error)
    }
}

/// Deterministic synthetic spot price for a mint within one request.
fn synthesize_price(seed: u64, mint: &str) -> f64 {
    let mut state = seed ^ 0x5DEE_CE66;
    for byte in mint.bytes() {
        state = state.wrapping_mul(31).wrapping_add(u64::from(byte));
    }
    let unit = (state % 1_000_000) as f64 / 1_000_000.0;
    // spread across a plausible token price range, never zero
    0.01 + unit * 250.0
}

/// Deterministic synthetic series covering the rounded window at one point
/// per rounding step.
fn synthesize_series(
    seed: u64,
    mint: &str,
    timeframe: Timeframe,
    time_from: i64,
    time_to: i64,
) -> PriceHistorySeries {
    let base = synthesize_price(seed, mint);
    let step = timeframe.rounding_step().as_secs() as i64;

    let mut items = Vec::new();
    let mut state = seed;
    let mut t = time_from;
    while t <= time_to {
        state = state.wrapping_mul(16_807).wrapping_add(t as u64);
        let wobble = ((state % 1_000) as f64 / 1_000.0 - 0.5) * 0.04;
        items.push(PricePoint {
            unix_time: t,
            value: base * (1.0 + wobble),
        });
        t += step;
    }

    PriceHistorySeries {
        items,
        success: true,
        time_from,
        time_to,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failing, ok, RoutedExecutor};
    use lib_providers::transport::NoopRecorder;
    use std::time::Duration;

    fn service(executor: Arc<RoutedExecutor>) -> PriceService {
        let market_data = Arc::new(MarketDataClient::new(
            "https://api.example.com",
            "key",
            "solana",
            executor.clone(),
            Arc::new(NoopRecorder),
        ));
        let aggregator = Arc::new(AggregatorClient::new(
            "https://quote-api.example.com",
            None,
            executor,
            Arc::new(NoopRecorder),
        ));
        PriceService::new(Arc::new(PriceHistoryCache::new()), market_data, aggregator)
    }

    fn history_route() -> Vec<(&'static str, lib_providers::Result<lib_providers::transport::HttpResponse>)> {
        vec![(
            "history_price",
            ok(r#"{"data":{"items":[{"unixTime":1700000040,"value":1.5}]},"success":true}"#),
        )]
    }

    #[tokio::test]
    async fn same_bucket_callers_share_one_upstream_call() {
        let executor = RoutedExecutor::new(history_route());
        let service = service(executor.clone());
        let ctx = Ctx::new();

        let t1 = 1_700_000_045;
        let t2 = 1_700_000_095; // same minute bucket (boundaries fall on :40)

        let first = service
            .get_price_history(&ctx, "mintA", "1H", Some(t1))
            .await
            .unwrap();
        let second = service
            .get_price_history(&ctx, "mintA", "1H", Some(t2))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(executor.request_count(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_fresh_upstream_call() {
        let executor = RoutedExecutor::new(history_route());
        let service = service(executor.clone());
        let ctx = Ctx::new();

        service
            .get_price_history(&ctx, "mintA", "1H", Some(1_700_000_010))
            .await
            .unwrap();
        assert_eq!(executor.request_count(), 1);

        // shrink the entry's TTL to simulate the rounding step elapsing
        let stale = service.history.get("mintA", Timeframe::OneHour).unwrap();
        service
            .history
            .set_with_ttl("mintA", Timeframe::OneHour, stale, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;

        service
            .get_price_history(&ctx, "mintA", "1H", Some(1_700_000_010))
            .await
            .unwrap();
        assert_eq!(executor.request_count(), 2);
    }

    #[tokio::test]
    async fn unknown_timeframe_touches_nothing() {
        let executor = RoutedExecutor::new(history_route());
        let service = service(executor.clone());
        let ctx = Ctx::new();

        let err = service
            .get_price_history(&ctx, "mintA", "17M", Some(1_700_000_010))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(executor.request_count(), 0);
        assert!(service.history.is_empty());
    }

    #[tokio::test]
    async fn empty_mint_is_invalid() {
        let executor = RoutedExecutor::new(history_route());
        let service = service(executor);
        let ctx = Ctx::new();

        let err = service
            .get_price_history(&ctx, "  ", "1H", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn upstream_failure_does_not_populate_the_cache() {
        let executor = RoutedExecutor::new(vec![("history_price", failing())]);
        let service = service(executor.clone());
        let ctx = Ctx::new();

        let err = service
            .get_price_history(&ctx, "mintA", "1H", Some(1_700_000_010))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Upstream(_)));
        assert!(service.history.is_empty());

        // the next call goes upstream again instead of serving a bad entry
        let _ = service
            .get_price_history(&ctx, "mintA", "1H", Some(1_700_000_010))
            .await;
        assert_eq!(executor.request_count(), 2);
    }

    #[tokio::test]
    async fn debug_context_synthesizes_without_upstream_or_cache() {
        let executor = RoutedExecutor::new(history_route());
        let service = service(executor.clone());
        let ctx = Ctx::new().with_debug(true);

        let first = service
            .get_price_history(&ctx, "mintA", "1H", Some(1_700_000_010))
            .await
            .unwrap();
        let second = service
            .get_price_history(&ctx, "mintA", "1H", Some(1_700_000_010))
            .await
            .unwrap();

        // deterministic within a request, covering the rounded window
        assert_eq!(first, second);
        assert!(!first.items.is_empty());
        assert!(first.items.windows(2).all(|w| w[0].unix_time < w[1].unix_time));
        assert_eq!(executor.request_count(), 0);
        assert!(service.history.is_empty());
    }

    #[tokio::test]
    async fn get_prices_empty_input_skips_upstream() {
        let executor = RoutedExecutor::new(vec![("price", ok(r#"{"data":{}}"#))]);
        let service = service(executor.clone());
        let ctx = Ctx::new();

        let prices = service.get_prices(&ctx, &[]).await.unwrap();
        assert!(prices.is_empty());
        assert_eq!(executor.request_count(), 0);
    }

    #[tokio::test]
    async fn get_prices_delegates_to_the_aggregator() {
        let executor = RoutedExecutor::new(vec![(
            "/price?ids=",
            ok(r#"{"data":{"mintA":{"id":"mintA","price":3.25}}}"#),
        )]);
        let service = service(executor);
        let ctx = Ctx::new();

        let prices = service
            .get_prices(&ctx, &["mintA".to_string()])
            .await
            .unwrap();
        assert_eq!(prices["mintA"], 3.25);
    }

    #[tokio::test]
    async fn debug_prices_are_deterministic_per_request() {
        let executor = RoutedExecutor::new(vec![]);
        let service = service(executor.clone());
        let ctx = Ctx::new().with_debug(true);
        let mints = vec!["mintA".to_string(), "mintB".to_string()];

        let first = service.get_prices(&ctx, &mints).await.unwrap();
        let second = service.get_prices(&ctx, &mints).await.unwrap();

        assert_eq!(first, second);
        assert!(first.values().all(|price| *price > 0.0));
        assert_eq!(executor.request_count(), 0);
    }
}
