//! # Provider Adapters
//!
//! Typed clients for the external services the backend aggregates: the
//! market-data provider, the swap aggregator, the chain JSON-RPC node, and
//! off-chain metadata URIs.
//!
//! Every adapter routes its requests through an [`InstrumentedTransport`]
//! which reports call counts, opens a trace span, and measures latency. The
//! underlying HTTP executor is a trait object so tests can substitute an
//! in-memory implementation.

pub mod aggregator;
pub mod error;
pub mod market_data;
pub mod metadata;
pub mod rpc;
pub mod transport;

// Re-export commonly used types
pub use aggregator::AggregatorClient;
pub use error::{Error, Result};
pub use market_data::MarketDataClient;
pub use metadata::MetadataClient;
pub use rpc::ChainRpcClient;
pub use transport::{CallRecorder, HttpExecute, InstrumentedTransport, ReqwestExecutor};
