//! # Market-Data Provider Client
//!
//! Typed client for the market-data provider: price history, trending and
//! new-listing feeds, batch metadata and trade data, token overview, and
//! search.
//!
//! Auth rides on an API-key header; a chain discriminator header selects the
//! target chain. All responses must be JSON; HTML bodies are classified as
//! rate limiting by the transport layer. Batch endpoints accept at most
//! [`MAX_BATCH_SIZE`] mints per call, so callers must chunk.

pub mod types;

use crate::error::{Error, Result};
use crate::transport::{
    CallRecorder, HttpExecute, HttpRequest, InstrumentedTransport, ReqwestExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use types::{
    Envelope, HistoryPoint, HistoryPriceData, NewListing, NewListingData, SearchData, SearchToken,
    TokenMarketDataMap, TokenMetadataMap, TokenOverview, TrendingData, TrendingToken,
};

/// Service name reported to the call accountant.
pub const SERVICE_NAME: &str = "market-data";

/// Maximum mints per batch call.
pub const MAX_BATCH_SIZE: usize = 20;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sort key for the trending feed: 24h volume, descending.
pub const SORT_VOLUME_24H: &str = "volume24hUSD";

/// Sort key for the top-gainers view of the trending feed.
pub const SORT_PRICE_CHANGE_24H: &str = "priceChange24hPercent";

/// A fetched historical price series with its provider success flag.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub items: Vec<HistoryPoint>,
    pub success: bool,
}

/// Typed market-data provider client.
pub struct MarketDataClient {
    transport: InstrumentedTransport,
    base_url: String,
    api_key: String,
    chain: String,
}

impl MarketDataClient {
    /// Create a client over a custom executor (tests inject in-memory ones).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chain: impl Into<String>,
        executor: Arc<dyn HttpExecute>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Self {
        Self {
            transport: InstrumentedTransport::new(SERVICE_NAME, executor, recorder),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            chain: chain.into(),
        }
    }

    /// Create a production client with the default reqwest executor.
    pub fn connect(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        chain: impl Into<String>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Result<Self> {
        let executor = Arc::new(ReqwestExecutor::new(DEFAULT_TIMEOUT)?);
        Ok(Self::new(base_url, api_key, chain, executor, recorder))
    }

    fn request(&self, path_and_query: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{}", self.base_url, path_and_query))
            .header("X-API-KEY", self.api_key.clone())
            .header("x-chain", self.chain.clone())
            .header("accept", "application/json")
    }

    /// Fetch a historical price series for a mint over a rounded window.
    pub async fn history_price(
        &self,
        mint: &str,
        granularity: &str,
        time_from: i64,
        time_to: i64,
    ) -> Result<PriceHistory> {
        let request = self.request(&format!(
            "/defi/history_price?address={mint}&address_type=token&type={granularity}&time_from={time_from}&time_to={time_to}"
        ));
        let envelope: Envelope<HistoryPriceData> = self.transport.execute_json(request).await?;

        let mut items = envelope.data.items;
        items.sort_by_key(|point| point.unix_time);

        Ok(PriceHistory {
            items,
            success: envelope.success,
        })
    }

    /// Fetch the trending token list, sorted descending by the given key.
    ///
    /// `limit` is clamped to the provider's maximum of 50.
    pub async fn token_trending(&self, sort_by: &str, limit: usize) -> Result<Vec<TrendingToken>> {
        let limit = limit.min(50);
        let request = self.request(&format!(
            "/defi/token_trending?sort_by={sort_by}&sort_type=desc&offset=0&limit={limit}"
        ));
        let envelope: Envelope<TrendingData> = self.transport.execute_json(request).await?;

        Ok(envelope.data.tokens)
    }

    /// Fetch the full overview of a single token.
    pub async fn token_overview(&self, mint: &str) -> Result<TokenOverview> {
        let request = self.request(&format!("/defi/token_overview?address={mint}"));
        let envelope: Envelope<TokenOverview> = self.transport.execute_json(request).await?;

        Ok(envelope.data)
    }

    /// Fetch metadata for up to [`MAX_BATCH_SIZE`] mints in one call.
    pub async fn token_metadata_multiple(&self, mints: &[String]) -> Result<TokenMetadataMap> {
        self.check_batch(mints)?;
        if mints.is_empty() {
            return Ok(TokenMetadataMap::new());
        }

        let request = self.request(&format!(
            "/defi/v3/token/meta-data/multiple?list_address={}",
            mints.join(",")
        ));
        let envelope: Envelope<TokenMetadataMap> = self.transport.execute_json(request).await?;

        Ok(envelope.data)
    }

    /// Fetch 24h trade data for up to [`MAX_BATCH_SIZE`] mints in one call.
    pub async fn token_market_data_multiple(&self, mints: &[String]) -> Result<TokenMarketDataMap> {
        self.check_batch(mints)?;
        if mints.is_empty() {
            return Ok(TokenMarketDataMap::new());
        }

        let request = self.request(&format!(
            "/defi/v3/token/market-data/multiple?list_address={}",
            mints.join(",")
        ));
        let envelope: Envelope<TokenMarketDataMap> = self.transport.execute_json(request).await?;

        Ok(envelope.data)
    }

    /// Fetch newly listed tokens, meme platforms included.
    ///
    /// `limit` is clamped to the provider's page cap of 20.
    pub async fn new_listings(&self, limit: usize) -> Result<Vec<NewListing>> {
        let limit = limit.min(MAX_BATCH_SIZE);
        let request = self.request(&format!(
            "/defi/v2/tokens/new_listing?limit={limit}&meme_platform_enabled=true"
        ));
        let envelope: Envelope<NewListingData> = self.transport.execute_json(request).await?;

        Ok(envelope.data.items)
    }

    /// Full-text token search.
    pub async fn search(&self, keyword: &str, limit: usize) -> Result<Vec<SearchToken>> {
        let limit = limit.min(50);
        let request = self.request(&format!(
            "/defi/v3/search?keyword={}&target=token&limit={limit}",
            keyword
        ));
        let envelope: Envelope<SearchData> = self.transport.execute_json(request).await?;

        Ok(envelope.data.items)
    }

    fn check_batch(&self, mints: &[String]) -> Result<()> {
        if mints.len() > MAX_BATCH_SIZE {
            return Err(Error::InvalidBatch(format!(
                "{} mints exceeds the maximum of {MAX_BATCH_SIZE} per call",
                mints.len()
            )));
        }
        Ok(())
    }
}
