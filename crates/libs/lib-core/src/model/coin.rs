//! # Coin
//!
//! The catalog's unit of state: an opaque mint identity plus metadata and a
//! market snapshot. Snapshots are replaced as a whole; there are no partial
//! snapshot writes anywhere in the core.

use serde::{Deserialize, Serialize};

/// 24h market snapshot for a coin.
///
/// All fields default to zero until the first hydration pass fills them.
/// Snapshots are last-writer-wins; the catalog does not order them by
/// provider freshness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price_usd: f64,
    pub market_cap_usd: f64,
    pub volume_24h_usd: f64,
    pub volume_24h_change_pct: f64,
    pub price_24h_change_pct: f64,
    pub liquidity_usd: f64,
    pub fdv_usd: f64,
    pub rank: u32,
}

/// A token known to the catalog.
///
/// `mint` and `decimals` are immutable after creation. A coin enters the
/// catalog as a skeleton (identity only) and is hydrated by the enrichment
/// pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Opaque, globally unique token identifier on the target chain.
    pub mint: String,
    pub symbol: String,
    pub name: String,
    /// Token precision, 0–18.
    pub decimals: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    pub tags: Vec<String>,
    /// Market snapshot, replaced atomically as a whole.
    #[serde(flatten)]
    pub market: MarketSnapshot,
}

impl Coin {
    /// Create a skeleton coin carrying only its identity.
    ///
    /// Used by the discovery loops before hydration fills metadata and the
    /// market snapshot.
    pub fn skeleton(mint: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            ..Self::default()
        }
    }

    /// Whether this coin still awaits hydration.
    pub fn is_skeleton(&self) -> bool {
        self.symbol.is_empty() && self.name.is_empty()
    }
}
