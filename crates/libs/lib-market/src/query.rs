//! # Read API Surface
//!
//! The narrow read-only operations the transport layer invokes: browse a
//! derived view, look up a coin, search, and the two price reads. Inputs
//! are validated here; everything below assumes clean arguments.
//!
//! Two hooks can be injected by collaborators outside the core: a
//! name/symbol predicate (profanity filtering) that drops failing coins
//! from every read, and a logo rewriter (image proxy) applied to every
//! returned coin.

use crate::catalog::{CoinCatalog, ViewName};
use crate::history::PriceHistorySeries;
use crate::map_provider_error;
use crate::price_service::PriceService;
use lib_core::error::{AppError, Result};
use lib_core::model::Coin;
use lib_core::Ctx;
use lib_providers::market_data::types::SearchToken;
use lib_providers::market_data::MarketDataClient;
use lib_utils::validation::{validate_limit, validate_not_empty};
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum coins returned by `list_coins`.
pub const MAX_LIST_LIMIT: usize = 200;

/// Default page size when the caller passes no limit.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Maximum results for `search_coins`.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Maximum mints per `get_prices` request.
pub const MAX_PRICE_BATCH: usize = 100;

/// Predicate over a coin's display fields; coins failing it are dropped.
pub type NamePredicate = dyn Fn(&Coin) -> bool + Send + Sync;

/// Rewriter applied to every returned `logo_uri`.
pub type LogoRewriter = dyn Fn(&str) -> String + Send + Sync;

/// The read-only query surface.
pub struct QueryService {
    catalog: Arc<CoinCatalog>,
    prices: Arc<PriceService>,
    market_data: Arc<MarketDataClient>,
    name_filter: Option<Arc<NamePredicate>>,
    logo_rewriter: Option<Arc<LogoRewriter>>,
}

impl QueryService {
    pub fn new(
        catalog: Arc<CoinCatalog>,
        prices: Arc<PriceService>,
        market_data: Arc<MarketDataClient>,
    ) -> Self {
        Self {
            catalog,
            prices,
            market_data,
            name_filter: None,
            logo_rewriter: None,
        }
    }

    /// Inject a display-name predicate. Coins failing it never surface.
    pub fn with_name_filter(mut self, filter: Arc<NamePredicate>) -> Self {
        self.name_filter = Some(filter);
        self
    }

    /// Inject a logo URI rewriter applied to every returned coin.
    pub fn with_logo_rewriter(mut self, rewriter: Arc<LogoRewriter>) -> Self {
        self.logo_rewriter = Some(rewriter);
        self
    }

    /// List a derived view in producer order.
    pub fn list_coins(&self, view: &str, limit: Option<usize>) -> Result<Vec<Coin>> {
        let view = ViewName::parse(view)
            .ok_or_else(|| AppError::InvalidArgument(format!("unknown view: {view}")))?;

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        validate_limit(limit, 1, MAX_LIST_LIMIT)
            .map_err(|err| AppError::InvalidArgument(err.to_string()))?;

        Ok(self
            .catalog
            .get_view(view)
            .into_iter()
            .filter_map(|coin| self.present(coin))
            .take(limit)
            .collect())
    }

    /// Look up a single coin by mint.
    pub fn get_coin(&self, mint: &str) -> Result<Coin> {
        validate_not_empty(mint, "mint")
            .map_err(|err| AppError::InvalidArgument(err.to_string()))?;

        self.catalog
            .get_by_mint(mint)
            .and_then(|coin| self.present(coin))
            .ok_or_else(|| AppError::NotFound(format!("unknown mint: {mint}")))
    }

    /// Search tokens by free text, reconciling results against the catalog.
    ///
    /// Catalog entries win over provider payloads when both exist, so a
    /// hydrated coin's snapshot is preferred over the provider's sparse
    /// search row. An empty result is not an error.
    pub async fn search_coins(&self, keyword: &str, limit: usize) -> Result<Vec<Coin>> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        let results = self
            .market_data
            .search(keyword, limit)
            .await
            .map_err(map_provider_error)?;

        Ok(results
            .into_iter()
            .filter_map(|token| {
                let coin = self
                    .catalog
                    .get_by_mint(&token.address)
                    .unwrap_or_else(|| coin_from_search(token));
                self.present(coin)
            })
            .take(limit)
            .collect())
    }

    /// Price history passthrough, see [`PriceService::get_price_history`].
    pub async fn get_price_history(
        &self,
        ctx: &Ctx,
        mint: &str,
        timeframe: &str,
        reference_time: Option<i64>,
    ) -> Result<PriceHistorySeries> {
        self.prices
            .get_price_history(ctx, mint, timeframe, reference_time)
            .await
    }

    /// Spot prices for up to [`MAX_PRICE_BATCH`] mints.
    pub async fn get_prices(&self, ctx: &Ctx, mints: &[String]) -> Result<HashMap<String, f64>> {
        if mints.len() > MAX_PRICE_BATCH {
            return Err(AppError::InvalidArgument(format!(
                "{} mints exceeds the maximum of {MAX_PRICE_BATCH} per request",
                mints.len()
            )));
        }

        self.prices.get_prices(ctx, mints).await
    }

    /// Apply the injected hooks to an outgoing coin.
    fn present(&self, mut coin: Coin) -> Option<Coin> {
        if let Some(filter) = &self.name_filter {
            if !filter(&coin) {
                return None;
            }
        }
        if let Some(rewriter) = &self.logo_rewriter {
            coin.logo_uri = coin.logo_uri.map(|uri| rewriter(&uri));
        }
        Some(coin)
    }
}

fn coin_from_search(token: SearchToken) -> Coin {
    let mut coin = Coin::skeleton(token.address);
    coin.symbol = token.symbol;
    coin.name = token.name;
    coin.decimals = token.decimals.min(18);
    coin.logo_uri = token.logo_uri;
    coin.market.price_usd = token.price;
    coin.market.volume_24h_usd = token.volume_24h_usd;
    coin.market.rank = token.rank;
    coin
}
