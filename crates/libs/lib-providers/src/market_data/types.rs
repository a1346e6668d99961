//! # Market-Data Wire Types
//!
//! Response shapes for the market-data provider. Every endpoint wraps its
//! payload in a `{ data, success }` envelope.

use serde::Deserialize;
use std::collections::HashMap;

/// Standard response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub success: bool,
}

/// One point of a historical price series.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HistoryPoint {
    #[serde(rename = "unixTime")]
    pub unix_time: i64,
    pub value: f64,
}

/// Payload of `history_price`.
#[derive(Debug, Deserialize)]
pub struct HistoryPriceData {
    #[serde(default)]
    pub items: Vec<HistoryPoint>,
}

/// One entry of the trending list.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendingToken {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    #[serde(rename = "volume24hUSD", default)]
    pub volume_24h_usd: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub rank: u32,
}

/// Payload of `token_trending`.
#[derive(Debug, Deserialize)]
pub struct TrendingData {
    #[serde(rename = "updateUnixTime", default)]
    pub update_unix_time: i64,
    #[serde(default)]
    pub tokens: Vec<TrendingToken>,
}

/// One entry of the new-listings feed.
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(rename = "liquidityAddedAt", default)]
    pub liquidity_added_at: Option<String>,
}

/// Payload of `tokens/new_listing`.
#[derive(Debug, Deserialize)]
pub struct NewListingData {
    #[serde(default)]
    pub items: Vec<NewListing>,
}

/// Per-mint entry of `token/meta-data/multiple`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenMetadata {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    /// Off-chain metadata document URI, when the token registers one.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-mint entry of `token/market-data/multiple`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenMarketData {
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "marketCap", default)]
    pub market_cap: f64,
    #[serde(rename = "volume24hUSD", default)]
    pub volume_24h_usd: f64,
    #[serde(rename = "volume24hChangePercent", default)]
    pub volume_24h_change_percent: f64,
    #[serde(rename = "priceChange24hPercent", default)]
    pub price_change_24h_percent: f64,
    #[serde(default)]
    pub liquidity: f64,
    #[serde(default)]
    pub fdv: f64,
    #[serde(default)]
    pub rank: u32,
}

/// Batch payloads keyed by mint.
pub type TokenMetadataMap = HashMap<String, TokenMetadata>;
pub type TokenMarketDataMap = HashMap<String, TokenMarketData>;

/// Payload of `token_overview`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenOverview {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    #[serde(flatten)]
    pub market: TokenMarketData,
}

/// One result of `search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchToken {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "volume24hUSD", default)]
    pub volume_24h_usd: f64,
    #[serde(default)]
    pub rank: u32,
}

/// Payload of `search`.
#[derive(Debug, Deserialize)]
pub struct SearchData {
    #[serde(default)]
    pub items: Vec<SearchToken>,
}
