//! # Market State
//!
//! The aggregate wiring every service behind one container: pool, provider
//! clients, caches, the accountant, and the read services. Built once at
//! startup and shared across the application.

use crate::catalog::CoinCatalog;
use crate::enrichment::{EnrichmentIntervals, EnrichmentPipeline};
use crate::history::PriceHistoryCache;
use crate::price_service::PriceService;
use crate::query::QueryService;
use crate::stats::ApiCallTracker;
use lib_core::config::Config;
use lib_core::DbPool;
use lib_providers::transport::CallRecorder;
use lib_providers::{AggregatorClient, ChainRpcClient, MarketDataClient, MetadataClient};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Chain discriminator sent to the market-data provider.
pub const CHAIN_NAME: &str = "solana";

/// Fully wired market-data aggregation state.
pub struct MarketState {
    pub pool: DbPool,
    pub stats: Arc<ApiCallTracker>,
    pub catalog: Arc<CoinCatalog>,
    pub history: Arc<PriceHistoryCache>,
    pub market_data: Arc<MarketDataClient>,
    pub aggregator: Arc<AggregatorClient>,
    pub chain_rpc: Arc<ChainRpcClient>,
    pub metadata: Arc<MetadataClient>,
    pub prices: Arc<PriceService>,
    pub query: Arc<QueryService>,
    pub pipeline: Arc<EnrichmentPipeline>,
    hydration_rx: Mutex<Option<mpsc::Receiver<String>>>,
    intervals: EnrichmentIntervals,
    initial_seed: bool,
}

impl MarketState {
    /// Wire every service from configuration.
    pub fn new(config: &Config, pool: DbPool) -> anyhow::Result<Self> {
        let stats = Arc::new(ApiCallTracker::new(pool.clone()));
        let recorder: Arc<dyn CallRecorder> = stats.clone();

        let market_data = Arc::new(MarketDataClient::connect(
            &config.market_data_endpoint,
            &config.market_data_api_key,
            CHAIN_NAME,
            recorder.clone(),
        )?);
        info!("market-data client ready");

        let aggregator = Arc::new(AggregatorClient::connect(
            &config.aggregator_endpoint,
            config.aggregator_api_key.clone(),
            recorder.clone(),
        )?);
        info!("aggregator client ready");

        let chain_rpc = Arc::new(ChainRpcClient::connect(
            &config.chain_rpc_endpoint,
            &config.chain_rpc_api_key,
            recorder.clone(),
        )?);
        info!("chain-rpc client ready");

        let metadata = Arc::new(MetadataClient::connect(recorder)?);

        let catalog = Arc::new(CoinCatalog::new());
        let history = Arc::new(PriceHistoryCache::new());

        let prices = Arc::new(PriceService::new(
            history.clone(),
            market_data.clone(),
            aggregator.clone(),
        ));
        let query = Arc::new(QueryService::new(
            catalog.clone(),
            prices.clone(),
            market_data.clone(),
        ));

        let (pipeline, hydration_rx) = EnrichmentPipeline::new(
            catalog.clone(),
            market_data.clone(),
            metadata.clone(),
            pool.clone(),
        );

        Ok(Self {
            pool,
            stats,
            catalog,
            history,
            market_data,
            aggregator,
            chain_rpc,
            metadata,
            prices,
            query,
            pipeline,
            hydration_rx: Mutex::new(Some(hydration_rx)),
            intervals: EnrichmentIntervals {
                new_listings: config.new_listings_interval,
                trending: config.trending_interval,
                top_gainers: config.top_gainers_interval,
            },
            initial_seed: config.initial_catalog_seed,
        })
    }

    /// Startup sequence: seed the counters and the catalog from the store,
    /// then run the optional one-shot catalog seed pass.
    pub async fn startup(&self) -> anyhow::Result<()> {
        if let Err(err) = self.stats.load_for_today().await {
            // a cold stats table is not fatal; counting starts from zero
            error!(error = %err, "loading today's api stats failed");
        }

        self.catalog.load_from_store(&self.pool).await?;

        if self.initial_seed {
            self.pipeline.seed_catalog().await;
        }

        Ok(())
    }

    /// Spawn the accountant's and the pipeline's background tasks.
    ///
    /// # Panics
    ///
    /// Panics if called twice: the hydration queue has exactly one consumer.
    pub fn spawn_background(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let hydration_rx = self
            .hydration_rx
            .lock()
            .expect("state lock poisoned")
            .take()
            .expect("background tasks already spawned");

        let mut handles = self.stats.clone().spawn_background(shutdown.clone());
        handles.extend(self.pipeline.clone().spawn_loops(
            self.intervals,
            hydration_rx,
            shutdown,
        ));

        info!("background enrichment and accounting tasks started");
        handles
    }

    /// Teardown: flush the counters once. Background tasks are expected to
    /// have been cancelled via the shutdown channel already.
    pub async fn shutdown_flush(&self) {
        if let Err(err) = self.stats.reset_stats().await {
            error!(error = %err, "final stats flush failed");
        }
    }
}
