//! # Swap Aggregator Client
//!
//! Typed client for the aggregator's batch spot-price endpoint and swap
//! quotes. Prices from this adapter are intentionally uncached: callers
//! wanting bounded staleness use the price-history path instead.

pub mod types;

use crate::error::Result;
use crate::transport::{
    CallRecorder, HttpExecute, HttpRequest, InstrumentedTransport, ReqwestExecutor,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use types::{PriceResponse, SwapQuote};

/// Service name reported to the call accountant.
pub const SERVICE_NAME: &str = "aggregator";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed aggregator client.
pub struct AggregatorClient {
    transport: InstrumentedTransport,
    base_url: String,
    api_key: Option<String>,
}

impl AggregatorClient {
    /// Create a client over a custom executor (tests inject in-memory ones).
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        executor: Arc<dyn HttpExecute>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Self {
        Self {
            transport: InstrumentedTransport::new(SERVICE_NAME, executor, recorder),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Create a production client with the default reqwest executor.
    pub fn connect(
        base_url: impl Into<String>,
        api_key: Option<String>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Result<Self> {
        let executor = Arc::new(ReqwestExecutor::new(DEFAULT_TIMEOUT)?);
        Ok(Self::new(base_url, api_key, executor, recorder))
    }

    fn request(&self, path_and_query: &str) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}{}", self.base_url, path_and_query))
            .header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key.clone());
        }
        request
    }

    /// Fetch spot prices for a batch of mints in one call.
    ///
    /// Mints the aggregator does not know are omitted from the result.
    /// An empty input returns an empty map without calling upstream.
    pub async fn prices(&self, mints: &[String]) -> Result<HashMap<String, f64>> {
        if mints.is_empty() {
            return Ok(HashMap::new());
        }

        let request = self.request(&format!("/price?ids={}", mints.join(",")));
        let response: PriceResponse = self.transport.execute_json(request).await?;

        Ok(response
            .data
            .into_iter()
            .map(|(mint, spot)| (mint, spot.price))
            .collect())
    }

    /// Fetch a swap quote for an input/output pair.
    pub async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapQuote> {
        let request = self.request(&format!(
            "/quote?inputMint={input_mint}&outputMint={output_mint}&amount={amount}&slippageBps={slippage_bps}"
        ));
        self.transport.execute_json(request).await
    }
}
