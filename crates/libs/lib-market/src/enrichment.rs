//! # Enrichment Pipeline
//!
//! Background loops that keep the catalog fresh:
//!
//! - **new-listing discovery** inserts skeleton coins for unseen mints and
//!   replaces the `new` view,
//! - **trending refresh** and **top-gainers refresh** replace their views
//!   from the provider's trending feed under different sort keys,
//! - **hydration fan-out** drains the queue in chunks of at most the batch
//!   cap, fills each coin from two parallel batch calls (metadata and
//!   24h trade data), and resolves missing logos from each token's
//!   off-chain metadata document.
//!
//! Discovery loops enqueue onto a bounded queue with `try_send`: when the
//! queue is full the mint is skipped for this pass and re-discovered on the
//! next tick. Loop errors are logged and swallowed; the next tick retries.

use crate::catalog::{CoinCatalog, ViewName};
use crate::map_provider_error;
use lib_core::error::Result;
use lib_core::model::store::CoinRepository;
use lib_core::model::{Coin, MarketSnapshot};
use lib_core::DbPool;
use lib_providers::market_data::types::{NewListing, TrendingToken};
use lib_providers::market_data::{MarketDataClient, MAX_BATCH_SIZE, SORT_PRICE_CHANGE_24H, SORT_VOLUME_24H};
use lib_providers::metadata::MetadataClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Bounded capacity of the hydration queue.
pub const HYDRATION_QUEUE_CAPACITY: usize = 1024;

/// Mints hydrated per chunk, bounded by the provider's batch cap.
pub const HYDRATION_CHUNK_SIZE: usize = MAX_BATCH_SIZE;

/// Page size for the new-listings feed.
pub const NEW_LISTINGS_PAGE_SIZE: usize = 20;

/// Entries requested from the trending feed.
pub const TRENDING_LIMIT: usize = 50;

/// Upper bound on each fire-and-forget persist of a hydrated coin.
pub const PERSIST_TIMEOUT: Duration = Duration::from_secs(2);

/// Loop periods, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentIntervals {
    pub new_listings: Duration,
    pub trending: Duration,
    pub top_gainers: Duration,
}

/// The catalog's writer: discovery, view refresh, and hydration.
pub struct EnrichmentPipeline {
    catalog: Arc<CoinCatalog>,
    market_data: Arc<MarketDataClient>,
    metadata: Arc<MetadataClient>,
    pool: DbPool,
    hydration_tx: mpsc::Sender<String>,
}

impl EnrichmentPipeline {
    /// Create the pipeline and its hydration queue.
    ///
    /// The receiver half is handed back so [`spawn_loops`](Self::spawn_loops)
    /// can move it into the hydration task.
    pub fn new(
        catalog: Arc<CoinCatalog>,
        market_data: Arc<MarketDataClient>,
        metadata: Arc<MetadataClient>,
        pool: DbPool,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        Self::with_queue_capacity(catalog, market_data, metadata, pool, HYDRATION_QUEUE_CAPACITY)
    }

    /// Create the pipeline with an explicit queue capacity.
    pub fn with_queue_capacity(
        catalog: Arc<CoinCatalog>,
        market_data: Arc<MarketDataClient>,
        metadata: Arc<MetadataClient>,
        pool: DbPool,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (hydration_tx, hydration_rx) = mpsc::channel(capacity);
        (
            Arc::new(Self {
                catalog,
                market_data,
                metadata,
                pool,
                hydration_tx,
            }),
            hydration_rx,
        )
    }

    /// Discover newly listed tokens: unseen mints enter the catalog as
    /// skeletons and queue for hydration; the `new` view takes the feed's
    /// ordering.
    pub async fn refresh_new_listings(&self) -> Result<()> {
        let listings = self
            .market_data
            .new_listings(NEW_LISTINGS_PAGE_SIZE)
            .await
            .map_err(map_provider_error)?;

        let mut order = Vec::with_capacity(listings.len());
        for listing in &listings {
            order.push(listing.address.clone());
            if self.catalog.get_by_mint(&listing.address).is_none() {
                self.catalog.upsert(skeleton_from_listing(listing))?;
                self.enqueue_hydration(listing.address.clone());
            }
        }

        debug!(count = order.len(), "new-listings view refreshed");
        self.catalog.replace_view(ViewName::New, order);
        Ok(())
    }

    /// Refresh the `trending` view, sorted by 24h volume descending.
    pub async fn refresh_trending(&self) -> Result<()> {
        let tokens = self
            .market_data
            .token_trending(SORT_VOLUME_24H, TRENDING_LIMIT)
            .await
            .map_err(map_provider_error)?;

        self.apply_trending_view(ViewName::Trending, tokens)
    }

    /// Refresh the `top-gainers` view, sorted by 24h price change.
    pub async fn refresh_top_gainers(&self) -> Result<()> {
        let tokens = self
            .market_data
            .token_trending(SORT_PRICE_CHANGE_24H, TRENDING_LIMIT)
            .await
            .map_err(map_provider_error)?;

        self.apply_trending_view(ViewName::TopGainers, tokens)
    }

    fn apply_trending_view(&self, view: ViewName, tokens: Vec<TrendingToken>) -> Result<()> {
        let mut order = Vec::with_capacity(tokens.len());
        for token in &tokens {
            order.push(token.address.clone());
            if self.catalog.get_by_mint(&token.address).is_none() {
                self.catalog.upsert(skeleton_from_trending(token))?;
                self.enqueue_hydration(token.address.clone());
            }
        }

        debug!(view = %view, count = order.len(), "view refreshed");
        self.catalog.replace_view(view, order);
        Ok(())
    }

    /// One-shot extra seed pass for fresh deployments: pull the trending
    /// feed once and queue everything for hydration before the periodic
    /// loops start.
    pub async fn seed_catalog(&self) {
        match self.refresh_trending().await {
            Ok(()) => info!("initial catalog seed pass completed"),
            Err(err) => warn!(error = %err, "initial catalog seed pass failed"),
        }
    }

    fn enqueue_hydration(&self, mint: String) {
        if let Err(err) = self.hydration_tx.try_send(mint) {
            // full queue: skip this pass, the mint is re-discovered next tick
            debug!(error = %err, "hydration queue full, skipping mint");
        }
    }

    /// Hydrate one chunk of mints: two parallel batch calls, a merged
    /// atomic upsert per mint, and a fire-and-forget persist per coin.
    ///
    /// A failed side contributes nothing; the other side's fields still
    /// land and the missing ones stay at their zero values. Tokens without
    /// a provider logo fall back to the image in their off-chain metadata
    /// document; a failed fetch there is non-fatal. The chunk never aborts
    /// as a whole.
    pub async fn hydrate_chunk(&self, mints: &[String]) {
        if mints.is_empty() {
            return;
        }

        let (metadata, market) = tokio::join!(
            self.market_data.token_metadata_multiple(mints),
            self.market_data.token_market_data_multiple(mints),
        );

        let metadata = metadata.unwrap_or_else(|err| {
            warn!(error = %err, "metadata batch failed, hydrating with trade data only");
            Default::default()
        });
        let market = market.unwrap_or_else(|err| {
            warn!(error = %err, "trade-data batch failed, hydrating with metadata only");
            Default::default()
        });

        let mut coins = Vec::with_capacity(mints.len());
        for mint in mints {
            let mut coin = self
                .catalog
                .get_by_mint(mint)
                .unwrap_or_else(|| Coin::skeleton(mint.clone()));

            if let Some(meta) = metadata.get(mint) {
                coin.symbol = meta.symbol.clone();
                coin.name = meta.name.clone();
                coin.decimals = meta.decimals.min(18);
                coin.logo_uri = meta.logo_uri.clone();
                coin.tags = meta.tags.clone();

                if coin.logo_uri.is_none() {
                    if let Some(uri) = meta.uri.as_deref() {
                        coin.logo_uri = self.fetch_offchain_logo(mint, uri).await;
                    }
                }
            }
            if let Some(data) = market.get(mint) {
                coin.market = MarketSnapshot {
                    price_usd: data.price,
                    market_cap_usd: data.market_cap,
                    volume_24h_usd: data.volume_24h_usd,
                    volume_24h_change_pct: data.volume_24h_change_percent,
                    price_24h_change_pct: data.price_change_24h_percent,
                    liquidity_usd: data.liquidity,
                    fdv_usd: data.fdv,
                    rank: data.rank,
                };
            }

            coins.push(coin);
        }

        self.catalog.upsert_batch(coins.clone());

        for coin in coins {
            let pool = self.pool.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(PERSIST_TIMEOUT, CoinRepository::upsert(&pool, &coin))
                    .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(mint = %coin.mint, error = %err, "failed to persist hydrated coin")
                    }
                    Err(_) => warn!(mint = %coin.mint, "persisting hydrated coin timed out"),
                }
            });
        }
    }

    /// Pull the image URL out of a token's off-chain metadata document.
    ///
    /// Documents live on arbitrary hosts and fail often; every failure is
    /// logged and treated as "no logo".
    async fn fetch_offchain_logo(&self, mint: &str, uri: &str) -> Option<String> {
        match self.metadata.fetch(uri).await {
            Ok(document) => document.image,
            Err(err) => {
                debug!(mint, uri, error = %err, "off-chain metadata fetch failed");
                None
            }
        }
    }

    /// Spawn loops A–D. Every loop owns its own timer and terminates when
    /// the shutdown channel fires.
    pub fn spawn_loops(
        self: Arc<Self>,
        intervals: EnrichmentIntervals,
        hydration_rx: mpsc::Receiver<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        handles.push(spawn_periodic(
            "new-listings",
            intervals.new_listings,
            self.clone(),
            shutdown.clone(),
            |pipeline| async move { pipeline.refresh_new_listings().await },
        ));
        handles.push(spawn_periodic(
            "trending",
            intervals.trending,
            self.clone(),
            shutdown.clone(),
            |pipeline| async move { pipeline.refresh_trending().await },
        ));
        handles.push(spawn_periodic(
            "top-gainers",
            intervals.top_gainers,
            self.clone(),
            shutdown.clone(),
            |pipeline| async move { pipeline.refresh_top_gainers().await },
        ));

        handles.push(tokio::spawn(self.run_hydration(hydration_rx, shutdown)));

        handles
    }

    async fn run_hydration(
        self: Arc<Self>,
        mut hydration_rx: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = hydration_rx.recv() => {
                    let Some(first) = received else { break };
                    let mut chunk = vec![first];
                    while chunk.len() < HYDRATION_CHUNK_SIZE {
                        match hydration_rx.try_recv() {
                            Ok(mint) => {
                                if !chunk.contains(&mint) {
                                    chunk.push(mint);
                                }
                            }
                            Err(_) => break,
                        }
                    }
                    self.hydrate_chunk(&chunk).await;
                }
            }
        }
    }
}

fn skeleton_from_listing(listing: &NewListing) -> Coin {
    Coin {
        mint: listing.address.clone(),
        symbol: listing.symbol.clone(),
        name: listing.name.clone(),
        decimals: listing.decimals.min(18),
        ..Coin::default()
    }
}

fn skeleton_from_trending(token: &TrendingToken) -> Coin {
    Coin {
        mint: token.address.clone(),
        symbol: token.symbol.clone(),
        name: token.name.clone(),
        decimals: token.decimals.min(18),
        logo_uri: token.logo_uri.clone(),
        ..Coin::default()
    }
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    pipeline: Arc<EnrichmentPipeline>,
    mut shutdown: watch::Receiver<bool>,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<EnrichmentPipeline>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = tick(pipeline.clone()).await {
                        warn!(loop_name = name, error = %err, "enrichment tick failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failing, ok, RoutedExecutor};
    use lib_core::model::store::{create_pool, init_schema};
    use lib_providers::transport::NoopRecorder;

    async fn pipeline_with(
        executor: Arc<RoutedExecutor>,
        capacity: usize,
    ) -> (Arc<EnrichmentPipeline>, mpsc::Receiver<String>, Arc<CoinCatalog>, DbPool) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        let catalog = Arc::new(CoinCatalog::new());
        let market_data = Arc::new(MarketDataClient::new(
            "https://api.example.com",
            "key",
            "solana",
            executor.clone(),
            Arc::new(NoopRecorder),
        ));
        let metadata = Arc::new(MetadataClient::new(executor, Arc::new(NoopRecorder)));
        let (pipeline, rx) = EnrichmentPipeline::with_queue_capacity(
            catalog.clone(),
            market_data,
            metadata,
            pool.clone(),
            capacity,
        );
        (pipeline, rx, catalog, pool)
    }

    #[tokio::test]
    async fn trending_refresh_populates_view_and_hydration_fills_snapshots() {
        let executor = RoutedExecutor::new(vec![
            (
                "token_trending",
                ok(r#"{"data":{"updateUnixTime":1,"tokens":[
                    {"address":"A","symbol":"AAA","name":"Token A","decimals":9,"rank":1},
                    {"address":"B","symbol":"BBB","name":"Token B","decimals":6,"rank":2}
                ]},"success":true}"#),
            ),
            (
                "meta-data/multiple",
                ok(r#"{"data":{
                    "A":{"address":"A","symbol":"AAA","name":"Token A","decimals":9,"tags":["verified"]},
                    "B":{"address":"B","symbol":"BBB","name":"Token B","decimals":6}
                },"success":true}"#),
            ),
            (
                "market-data/multiple",
                ok(r#"{"data":{
                    "A":{"price":2.5,"marketCap":1000.0,"volume24hUSD":50.0,"liquidity":400.0,"rank":1},
                    "B":{"price":0.5,"marketCap":500.0,"volume24hUSD":25.0,"liquidity":200.0,"rank":2}
                },"success":true}"#),
            ),
        ]);
        let (pipeline, mut rx, catalog, _pool) = pipeline_with(executor, 64).await;

        pipeline.refresh_trending().await.unwrap();

        // both unseen mints queued for hydration, view holds the feed order
        let queued = [rx.try_recv().unwrap(), rx.try_recv().unwrap()];
        assert_eq!(queued, ["A".to_string(), "B".to_string()]);

        pipeline.hydrate_chunk(&queued).await;

        let trending = catalog.get_view(ViewName::Trending);
        assert_eq!(trending.len(), 2);
        assert_eq!(trending[0].symbol, "AAA");
        assert_eq!(trending[0].market.price_usd, 2.5);
        assert_eq!(trending[1].market.rank, 2);
    }

    #[tokio::test]
    async fn partial_hydration_keeps_metadata_when_trade_data_fails() {
        let executor = RoutedExecutor::new(vec![
            (
                "meta-data/multiple",
                ok(r#"{"data":{
                    "A":{"address":"A","symbol":"AAA","name":"Token A","decimals":9},
                    "B":{"address":"B","symbol":"BBB","name":"Token B","decimals":6},
                    "C":{"address":"C","symbol":"CCC","name":"Token C","decimals":0}
                },"success":true}"#),
            ),
            ("market-data/multiple", failing()),
        ]);
        let (pipeline, _rx, catalog, _pool) = pipeline_with(executor, 64).await;

        let mints = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        pipeline.hydrate_chunk(&mints).await;

        for mint in &mints {
            let coin = catalog.get_by_mint(mint).unwrap();
            assert_eq!(&coin.mint, mint);
            assert!(!coin.symbol.is_empty());
            // trade data failed, so the snapshot stays at its zero values
            assert_eq!(coin.market, MarketSnapshot::default());
        }
    }

    #[tokio::test]
    async fn missing_logo_is_resolved_from_the_offchain_document() {
        let executor = RoutedExecutor::new(vec![
            (
                "meta-data/multiple",
                ok(r#"{"data":{"A":{"address":"A","symbol":"AAA","name":"Token A","decimals":9,
                    "uri":"https://meta.example.com/a.json"}},"success":true}"#),
            ),
            (
                "market-data/multiple",
                ok(r#"{"data":{"A":{"price":1.0}},"success":true}"#),
            ),
            (
                "meta.example.com",
                ok(r#"{"name":"Token A","image":"https://img.example.com/a.png"}"#),
            ),
        ]);
        let (pipeline, _rx, catalog, _pool) = pipeline_with(executor, 64).await;

        pipeline.hydrate_chunk(&["A".to_string()]).await;

        let coin = catalog.get_by_mint("A").unwrap();
        assert_eq!(
            coin.logo_uri.as_deref(),
            Some("https://img.example.com/a.png")
        );
    }

    #[tokio::test]
    async fn offchain_document_failure_is_non_fatal() {
        let executor = RoutedExecutor::new(vec![
            (
                "meta-data/multiple",
                ok(r#"{"data":{"A":{"address":"A","symbol":"AAA","name":"Token A","decimals":9,
                    "uri":"https://meta.example.com/a.json"}},"success":true}"#),
            ),
            (
                "market-data/multiple",
                ok(r#"{"data":{"A":{"price":1.0}},"success":true}"#),
            ),
            ("meta.example.com", failing()),
        ]);
        let (pipeline, _rx, catalog, _pool) = pipeline_with(executor, 64).await;

        pipeline.hydrate_chunk(&["A".to_string()]).await;

        let coin = catalog.get_by_mint("A").unwrap();
        assert_eq!(coin.symbol, "AAA");
        assert_eq!(coin.market.price_usd, 1.0);
        assert!(coin.logo_uri.is_none());
    }

    #[tokio::test]
    async fn provider_logo_wins_over_the_offchain_document() {
        let executor = RoutedExecutor::new(vec![
            (
                "meta-data/multiple",
                ok(r#"{"data":{"A":{"address":"A","symbol":"AAA","name":"Token A","decimals":9,
                    "logoURI":"https://cdn.example.com/a.png",
                    "uri":"https://meta.example.com/a.json"}},"success":true}"#),
            ),
            (
                "market-data/multiple",
                ok(r#"{"data":{"A":{"price":1.0}},"success":true}"#),
            ),
        ]);
        let (pipeline, _rx, catalog, _pool) = pipeline_with(executor.clone(), 64).await;

        pipeline.hydrate_chunk(&["A".to_string()]).await;

        let coin = catalog.get_by_mint("A").unwrap();
        assert_eq!(coin.logo_uri.as_deref(), Some("https://cdn.example.com/a.png"));
        // the document is never fetched when the provider already has a logo
        assert!(executor
            .requests
            .lock()
            .unwrap()
            .iter()
            .all(|url| !url.contains("meta.example.com")));
    }

    #[tokio::test]
    async fn hydration_persists_coins_to_the_store() {
        let executor = RoutedExecutor::new(vec![
            (
                "meta-data/multiple",
                ok(r#"{"data":{"A":{"address":"A","symbol":"AAA","name":"Token A","decimals":9}},"success":true}"#),
            ),
            (
                "market-data/multiple",
                ok(r#"{"data":{"A":{"price":1.0}},"success":true}"#),
            ),
        ]);
        let (pipeline, _rx, _catalog, pool) = pipeline_with(executor, 64).await;

        pipeline.hydrate_chunk(&["A".to_string()]).await;

        // the persist is fire-and-forget on its own task
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = CoinRepository::get(&pool, "A").await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn full_queue_skips_enqueue_without_failing_the_pass() {
        let executor = RoutedExecutor::new(vec![(
            "token_trending",
            ok(r#"{"data":{"updateUnixTime":1,"tokens":[
                {"address":"A","symbol":"AAA","name":"A","decimals":9},
                {"address":"B","symbol":"BBB","name":"B","decimals":9},
                {"address":"C","symbol":"CCC","name":"C","decimals":9}
            ]},"success":true}"#),
        )]);
        let (pipeline, mut rx, catalog, _pool) = pipeline_with(executor, 2).await;

        pipeline.refresh_trending().await.unwrap();

        // all three made it into the catalog, only two fit in the queue
        assert_eq!(catalog.len(), 3);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn known_mints_are_not_requeued() {
        let executor = RoutedExecutor::new(vec![(
            "token_trending",
            ok(r#"{"data":{"updateUnixTime":1,"tokens":[
                {"address":"A","symbol":"AAA","name":"A","decimals":9}
            ]},"success":true}"#),
        )]);
        let (pipeline, mut rx, _catalog, _pool) = pipeline_with(executor, 64).await;

        pipeline.refresh_trending().await.unwrap();
        pipeline.refresh_trending().await.unwrap();

        // the second pass found the mint already catalogued
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn new_listings_feed_fills_the_new_view() {
        let executor = RoutedExecutor::new(vec![(
            "new_listing",
            ok(r#"{"data":{"items":[
                {"address":"N1","symbol":"NNN","name":"Fresh","decimals":6},
                {"address":"N2","symbol":"MMM","name":"Fresher","decimals":9}
            ]},"success":true}"#),
        )]);
        let (pipeline, mut rx, catalog, _pool) = pipeline_with(executor, 64).await;

        pipeline.refresh_new_listings().await.unwrap();

        let fresh = catalog.get_view(ViewName::New);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].mint, "N1");
        assert!(fresh[0].is_skeleton() || !fresh[0].symbol.is_empty());
        assert_eq!(rx.try_recv().unwrap(), "N1");
    }

    #[tokio::test]
    async fn provider_failure_surfaces_and_leaves_the_catalog_alone() {
        let executor = RoutedExecutor::new(vec![("token_trending", failing())]);
        let (pipeline, mut rx, catalog, _pool) = pipeline_with(executor, 64).await;

        let err = pipeline.refresh_trending().await.unwrap_err();
        assert!(err.is_retriable());
        assert!(catalog.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
