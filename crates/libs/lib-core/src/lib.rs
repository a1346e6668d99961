//! # Core Library
//!
//! Configuration, error type, request context, and the durable store for the
//! portfolio backend.

pub mod config;
pub mod ctx;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use config::Config;
pub use ctx::Ctx;
pub use error::{AppError, Result};
pub use model::store::{create_pool, DbPool};
