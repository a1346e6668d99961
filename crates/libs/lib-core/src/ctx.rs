//! # Request Context
//!
//! Per-request metadata threaded explicitly through the read services.
//!
//! Every inbound call gets a [`Ctx`] carrying a unique request id (propagated
//! to providers as a trace header) and the debug flag. Debug-flagged contexts
//! make the price services return synthesized data without calling upstream.

use std::time::SystemTime;
use uuid::Uuid;

/// Request context for read operations.
#[derive(Clone, Debug)]
pub struct Ctx {
    /// Unique request identifier.
    request_id: Uuid,
    /// When the request entered the system.
    timestamp: SystemTime,
    /// Debug mode: price reads return synthesized data, bypassing providers.
    debug: bool,
}

impl Ctx {
    /// Create a new context with a generated request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
            debug: false,
        }
    }

    /// Set the debug flag on this context.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Deterministic per-request seed derived from the request id.
    ///
    /// Two synthesized reads within one request observe the same seed, so
    /// debug-mode data is stable for the duration of a request.
    pub fn seed(&self) -> u64 {
        let bytes = self.request_id.as_bytes();
        u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ])
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Self::new()
    }
}
