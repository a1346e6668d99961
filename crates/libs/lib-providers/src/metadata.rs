//! # Off-Chain Metadata Client
//!
//! Fetches token metadata documents from arbitrary URIs (logo, description).
//! Enrichment treats every failure here as non-fatal: a coin without an
//! off-chain document is still a valid coin.

use crate::error::Result;
use crate::transport::{
    CallRecorder, HttpExecute, HttpRequest, InstrumentedTransport, ReqwestExecutor,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Service name reported to the call accountant.
pub const SERVICE_NAME: &str = "metadata";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The subset of an off-chain metadata document the catalog consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffchainMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Client for arbitrary metadata URIs.
pub struct MetadataClient {
    transport: InstrumentedTransport,
}

impl MetadataClient {
    pub fn new(executor: Arc<dyn HttpExecute>, recorder: Arc<dyn CallRecorder>) -> Self {
        Self {
            transport: InstrumentedTransport::new(SERVICE_NAME, executor, recorder),
        }
    }

    pub fn connect(recorder: Arc<dyn CallRecorder>) -> Result<Self> {
        let executor = Arc::new(ReqwestExecutor::new(DEFAULT_TIMEOUT)?);
        Ok(Self::new(executor, recorder))
    }

    /// Fetch and decode a metadata document.
    pub async fn fetch(&self, uri: &str) -> Result<OffchainMetadata> {
        let request = HttpRequest::get(uri).header("accept", "application/json");
        self.transport.execute_json(request).await
    }
}
