//! # Provider Error Classification
//!
//! Adapter failures fall into a small set of classes the callers act on:
//! transport problems and bad statuses are retriable upstream failures,
//! rate limiting invites backoff, and batch-size violations are caller
//! bugs surfaced as invalid arguments.

use thiserror::Error;

/// Convenience type alias for provider results.
pub type Result<T> = std::result::Result<T, Error>;

/// Classified provider adapter error.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, TLS, or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response that is not a rate-limit or not-found signal.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body failed to decode as the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Provider signalled throttling: HTTP 429, or an HTML body at any
    /// status (upstreams serve HTML error pages when rate limiting).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The requested entity does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller exceeded a batch endpoint's maximum size. Chunk and retry.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),
}

impl Error {
    /// Whether the failure may clear on retry after backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Status { .. } | Error::RateLimited(_)
        )
    }
}
