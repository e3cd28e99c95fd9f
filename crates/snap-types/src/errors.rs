//! # Error Types
//!
//! Errors raised while turning wire bytes into typed values and back.

use thiserror::Error;

/// Failure to (de)serialize a message or payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Value could not be serialized.
    #[error("encode {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    /// Bytes did not decode as the expected type.
    #[error("decode {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },
}
