//! # Market Aggregation Core
//!
//! The backend's market-data heart: the coin catalog and its enrichment
//! pipeline, the timeframe-aware price-history cache, the API-call
//! accountant, and the read services the transport layer calls into.
//!
//! ```text
//! providers ─► enrichment ─► catalog ─► query surface
//!                  │                        │
//!                  ▼                        ▼
//!            durable store          price service ─► history cache
//! ```
//!
//! Every provider call flows through the instrumented transport and lands
//! in the accountant's daily counters.

pub mod catalog;
pub mod enrichment;
pub mod history;
pub mod price_service;
pub mod query;
pub mod state;
pub mod stats;
pub mod timeframe;

// Re-export commonly used types
pub use catalog::{CoinCatalog, ViewName};
pub use enrichment::{EnrichmentIntervals, EnrichmentPipeline};
pub use history::{PriceHistoryCache, PriceHistorySeries, PricePoint};
pub use price_service::PriceService;
pub use query::QueryService;
pub use state::MarketState;
pub use stats::ApiCallTracker;
pub use timeframe::Timeframe;

use lib_core::error::AppError;

/// Map a classified provider failure onto the application error surface.
///
/// Rate limiting and batch-size violations keep their identity; everything
/// else is a retriable upstream failure.
pub(crate) fn map_provider_error(err: lib_providers::Error) -> AppError {
    match err {
        lib_providers::Error::RateLimited(msg) => AppError::RateLimited(msg),
        lib_providers::Error::InvalidBatch(msg) => AppError::InvalidArgument(msg),
        lib_providers::Error::NotFound(msg) => AppError::NotFound(msg),
        other => AppError::Upstream(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod test_support;
