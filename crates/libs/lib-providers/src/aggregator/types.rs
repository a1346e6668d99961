//! # Aggregator Wire Types
//!
//! Response shapes for the swap aggregator's price and quote endpoints.

use serde::Deserialize;
use std::collections::HashMap;

/// Per-mint entry of the batch price endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotPrice {
    pub id: String,
    pub price: f64,
}

/// Response of the batch price endpoint: `{ "data": { mint: { id, price } } }`.
#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    #[serde(default)]
    pub data: HashMap<String, SpotPrice>,
}

/// A swap quote for an input/output mint pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub input_mint: String,
    pub in_amount: String,
    pub output_mint: String,
    pub out_amount: String,
    #[serde(default)]
    pub price_impact_pct: String,
    #[serde(default)]
    pub slippage_bps: u16,
}
