//! # Chaincode Response
//!
//! What `Init` and `Invoke` return, and what a nested invocation yields.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Status codes shared with the peer.
pub mod status {
    /// Success.
    pub const OK: i32 = 200;
    /// Responses at or above this are failures.
    pub const ERROR_THRESHOLD: i32 = 400;
    /// Generic failure.
    pub const ERROR: i32 = 500;
}

/// Outcome of a chaincode entry point.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-like status code.
    pub status: i32,
    /// Human-readable failure reason.
    pub message: String,
    /// Result body.
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
}

impl Response {
    /// Successful response carrying `payload`.
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: status::OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    /// Failed response with status `ERROR`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: status::ERROR,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    /// Whether the status is below the error threshold.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status < status::ERROR_THRESHOLD
    }
}
