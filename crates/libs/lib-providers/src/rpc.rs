//! # Chain JSON-RPC Client
//!
//! JSON-RPC 2.0 client for the chain node. Account-scanning RPCs are heavy,
//! so this adapter carries a 30-second timeout instead of the 10 seconds the
//! HTTP providers use.
//!
//! Every call shares one URL path, so the RPC method name is reported as the
//! endpoint to the call accountant.

use crate::error::{Error, Result};
use crate::transport::{
    CallRecorder, HttpExecute, HttpRequest, InstrumentedTransport, ReqwestExecutor,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Service name reported to the call accountant.
pub const SERVICE_NAME: &str = "chain-rpc";

/// Default request timeout. Account scans are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// `getBalance`-style responses wrap their value in a context envelope.
#[derive(Debug, Deserialize)]
struct ContextValue<T> {
    value: T,
}

/// A token account returned by `getTokenAccountsByOwner` (jsonParsed).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenAccount {
    pub pubkey: String,
    pub account: Value,
}

#[derive(Debug, Deserialize)]
struct TokenAccountList {
    value: Vec<TokenAccount>,
}

/// Typed chain JSON-RPC client.
pub struct ChainRpcClient {
    transport: InstrumentedTransport,
    endpoint: String,
    api_key: String,
    next_id: AtomicU64,
}

impl ChainRpcClient {
    /// Create a client over a custom executor (tests inject in-memory ones).
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        executor: Arc<dyn HttpExecute>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Self {
        Self {
            transport: InstrumentedTransport::new(SERVICE_NAME, executor, recorder),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a production client with the default reqwest executor.
    pub fn connect(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        recorder: Arc<dyn CallRecorder>,
    ) -> Result<Self> {
        let executor = Arc::new(ReqwestExecutor::new(DEFAULT_TIMEOUT)?);
        Ok(Self::new(endpoint, api_key, executor, recorder))
    }

    /// Issue a JSON-RPC call and decode its `result` field.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let request = HttpRequest::post_json(&self.endpoint, &body)?
            .header("authorization", format!("Bearer {}", self.api_key))
            .endpoint_hint(method);

        let response: RpcResponse<T> = self.transport.execute_json(request).await?;

        if let Some(error) = response.error {
            return Err(Error::Status {
                status: 200,
                message: format!("rpc error {}: {}", error.code, error.message),
            });
        }

        response
            .result
            .ok_or_else(|| Error::Decode("rpc response carried neither result nor error".into()))
    }

    /// Fetch the lamport balance of an account.
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let context: ContextValue<u64> = self.call("getBalance", json!([address])).await?;
        Ok(context.value)
    }

    /// Scan the token accounts owned by a wallet.
    pub async fn get_token_accounts_by_owner(
        &self,
        owner: &str,
        program_id: &str,
    ) -> Result<Vec<TokenAccount>> {
        let list: TokenAccountList = self
            .call(
                "getTokenAccountsByOwner",
                json!([owner, { "programId": program_id }, { "encoding": "jsonParsed" }]),
            )
            .await?;
        Ok(list.value)
    }
}
