//! # Kind-Specific Payloads
//!
//! Structured bodies carried in `Message::payload`.
//!
//! ## Encoding Rules
//!
//! - Structured payloads are bincode-encoded (see [`crate::codec`]).
//! - `GET_STATE` and `DEL_STATE` carry the raw UTF-8 key, not a struct.
//! - The `RESPONSE` to `GET_STATE` carries the raw value; empty means absent.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Identity a chaincode registers under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeId {
    /// Chaincode name, optionally `name/channel` for nested invocations.
    pub name: String,
}

/// Arguments of an INIT, TRANSACTION or nested invocation.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInput {
    /// Raw arguments; by convention the first is the function name.
    #[serde_as(as = "Vec<Bytes>")]
    pub args: Vec<Vec<u8>>,
}

impl ChaincodeInput {
    /// Build input from string arguments.
    pub fn from_strings<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            args: args
                .into_iter()
                .map(|a| a.as_ref().as_bytes().to_vec())
                .collect(),
        }
    }
}

/// Target of an `INVOKE_CHAINCODE` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeSpec {
    /// Chaincode to call.
    pub chaincode_id: ChaincodeId,
    /// Arguments for the called chaincode.
    pub input: ChaincodeInput,
}

// =============================================================================
// STATE ACCESS
// =============================================================================

/// Body of `PUT_STATE`.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutStateInfo {
    /// Key to write.
    pub key: String,
    /// Value to write.
    #[serde_as(as = "Bytes")]
    pub value: Vec<u8>,
}

/// Body of `GET_STATE_BY_RANGE`; `end_key` is exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStateByRange {
    pub start_key: String,
    pub end_key: String,
}

/// Body of `QUERY_STATE_NEXT`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStateNext {
    /// Server-side iterator handle.
    pub id: String,
}

/// Body of `QUERY_STATE_CLOSE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStateClose {
    /// Server-side iterator handle.
    pub id: String,
}

/// Body of `GET_QUERY_RESULT`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetQueryResult {
    /// Backend-specific rich query.
    pub query: String,
}

/// Body of `GET_HISTORY_FOR_KEY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetHistoryForKey {
    pub key: String,
}

// =============================================================================
// QUERY RESULTS
// =============================================================================

/// One encoded entry of a result page.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResultBytes {
    #[serde_as(as = "Bytes")]
    pub result_bytes: Vec<u8>,
}

/// A page of query results plus the handle to fetch the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Entries of this page.
    pub results: Vec<QueryResultBytes>,
    /// Whether the peer holds more pages behind `id`.
    pub has_more: bool,
    /// Server-side iterator handle.
    pub id: String,
}

/// Entry of a range or rich query.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KV {
    pub namespace: String,
    pub key: String,
    #[serde_as(as = "Bytes")]
    pub value: Vec<u8>,
}

/// Entry of a key history query.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModification {
    /// Transaction that wrote this version.
    pub txid: String,
    #[serde_as(as = "Bytes")]
    pub value: Vec<u8>,
    /// Commit time, seconds since the Unix epoch.
    pub timestamp_secs: u64,
    pub is_delete: bool,
}
