//! # Payload Codec
//!
//! Every structured payload and the envelope itself are bincode-encoded.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::CodecError;

/// Serialize a value with bincode.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode {
        type_name: short_type_name::<T>(),
        reason: e.to_string(),
    })
}

/// Deserialize a value with bincode.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
        type_name: short_type_name::<T>(),
        reason: e.to_string(),
    })
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
