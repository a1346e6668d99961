//! # Centralized Error Handling
//!
//! Application-wide error type [`AppError`] used consistently across the
//! backend crates, following the `thiserror` pattern.
//!
//! ## Error Categories
//!
//! - [`InvalidArgument`](AppError::InvalidArgument): bad caller input
//!   (unknown timeframe, empty mint, oversized batch)
//! - [`NotFound`](AppError::NotFound): entity absent from catalog or store
//! - [`Upstream`](AppError::Upstream): a required provider call failed;
//!   retriable, caches are never populated from it
//! - [`RateLimited`](AppError::RateLimited): upstream signalled throttling
//!   (HTML body or 429); callers may back off
//! - [`Config`](AppError::Config) / [`Internal`](AppError::Internal):
//!   startup misconfiguration or impossible state

use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type covering all core error scenarios.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error during startup or environment loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input validation error.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required external provider call failed (transport, non-2xx status,
    /// HTML body, or decode failure). Retriable.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    /// Upstream signalled rate limiting. Callers may back off; the core does
    /// not retry automatically on the request path.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Internal server error (unexpected failures, broken invariants).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AppError::Upstream(_) | AppError::RateLimited(_))
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert `sqlx::Error` to `AppError`.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Database record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                AppError::Internal(format!("Database error: {}", db_err.message()))
            }
            _ => AppError::Internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}
