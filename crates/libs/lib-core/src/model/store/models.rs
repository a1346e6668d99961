//! # Store Row Types
//!
//! Database row shapes for the persisted entities, with conversions to and
//! from the domain types. `tags` is stored as a JSON array in a TEXT column.

use crate::model::{Coin, MarketSnapshot};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Coin row as persisted in the `coins` table.
#[derive(Debug, Clone, FromRow)]
pub struct CoinRow {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i64,
    pub logo_uri: Option<String>,
    /// JSON-encoded array of tag strings.
    pub tags: String,
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub volume_24h_usd: f64,
    pub volume_24h_change_pct: f64,
    pub price_24h_change_pct: f64,
    pub liquidity_usd: f64,
    pub fdv_usd: f64,
    pub rank: i64,
    pub updated_at: DateTime<Utc>,
}

impl CoinRow {
    /// Build a row from a domain coin, stamping `updated_at` with now.
    pub fn from_coin(coin: &Coin) -> Self {
        Self {
            mint: coin.mint.clone(),
            symbol: coin.symbol.clone(),
            name: coin.name.clone(),
            decimals: i64::from(coin.decimals),
            logo_uri: coin.logo_uri.clone(),
            tags: serde_json::to_string(&coin.tags).unwrap_or_else(|_| "[]".to_string()),
            price_usd: coin.market.price_usd,
            market_cap_usd: coin.market.market_cap_usd,
            volume_24h_usd: coin.market.volume_24h_usd,
            volume_24h_change_pct: coin.market.volume_24h_change_pct,
            price_24h_change_pct: coin.market.price_24h_change_pct,
            liquidity_usd: coin.market.liquidity_usd,
            fdv_usd: coin.market.fdv_usd,
            rank: i64::from(coin.market.rank),
            updated_at: Utc::now(),
        }
    }
}

impl From<CoinRow> for Coin {
    fn from(row: CoinRow) -> Self {
        Coin {
            mint: row.mint,
            symbol: row.symbol,
            name: row.name,
            decimals: row.decimals.clamp(0, 18) as u8,
            logo_uri: row.logo_uri,
            tags: serde_json::from_str(&row.tags).unwrap_or_default(),
            market: MarketSnapshot {
                price_usd: row.price_usd,
                market_cap_usd: row.market_cap_usd,
                volume_24h_usd: row.volume_24h_usd,
                volume_24h_change_pct: row.volume_24h_change_pct,
                price_24h_change_pct: row.price_24h_change_pct,
                liquidity_usd: row.liquidity_usd,
                fdv_usd: row.fdv_usd,
                rank: row.rank.max(0) as u32,
            },
        }
    }
}

/// Daily API-call counter row, unique per (service, endpoint, date).
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct ApiStatRow {
    pub service_name: String,
    pub endpoint_name: String,
    pub date: NaiveDate,
    pub count: i64,
}

/// Word list entry consumed by the out-of-scope profanity filter.
#[derive(Debug, Clone, FromRow)]
pub struct NaughtyWordRow {
    pub word: String,
    pub created_at: DateTime<Utc>,
}
