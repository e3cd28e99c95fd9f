//! # Message Envelope
//!
//! The single wire unit exchanged between a snap process and its peer.
//!
//! ## Properties
//!
//! - **Kind-tagged**: `kind` decides how `payload` is interpreted.
//! - **Correlation**: every message except `REGISTER`, `REGISTERED` and `READY`
//!   carries the transaction id it belongs to.
//! - **Pass-through**: `proposal` and `event` are never inspected by the
//!   protocol engine, only forwarded.
//! - **Immutable**: a message is built fresh for every request and never
//!   mutated after it is handed to a writer.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

use crate::errors::CodecError;

/// Every message kind understood by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum MessageKind {
    /// Chaincode -> peer handshake request.
    Register,
    /// Peer accepted the registration.
    Registered,
    /// Peer is ready to dispatch work.
    Ready,
    /// Begin an initialization cycle.
    Init,
    /// Begin a transaction cycle.
    Transaction,
    /// Successful reply to a correlated request.
    Response,
    /// Failed reply, or failure report for a cycle.
    Error,
    /// A cycle finished.
    Completed,
    /// Stream liveness check, never affects protocol state.
    Keepalive,
    GetState,
    PutState,
    DelState,
    GetStateByRange,
    QueryStateNext,
    QueryStateClose,
    GetQueryResult,
    GetHistoryForKey,
    InvokeChaincode,
}

impl MessageKind {
    /// All kinds, in declaration order.
    pub const ALL: [MessageKind; 18] = [
        MessageKind::Register,
        MessageKind::Registered,
        MessageKind::Ready,
        MessageKind::Init,
        MessageKind::Transaction,
        MessageKind::Response,
        MessageKind::Error,
        MessageKind::Completed,
        MessageKind::Keepalive,
        MessageKind::GetState,
        MessageKind::PutState,
        MessageKind::DelState,
        MessageKind::GetStateByRange,
        MessageKind::QueryStateNext,
        MessageKind::QueryStateClose,
        MessageKind::GetQueryResult,
        MessageKind::GetHistoryForKey,
        MessageKind::InvokeChaincode,
    ];

    /// Protocol name of the kind, as it appears on the wire and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Registered => "REGISTERED",
            Self::Ready => "READY",
            Self::Init => "INIT",
            Self::Transaction => "TRANSACTION",
            Self::Response => "RESPONSE",
            Self::Error => "ERROR",
            Self::Completed => "COMPLETED",
            Self::Keepalive => "KEEPALIVE",
            Self::GetState => "GET_STATE",
            Self::PutState => "PUT_STATE",
            Self::DelState => "DEL_STATE",
            Self::GetStateByRange => "GET_STATE_BY_RANGE",
            Self::QueryStateNext => "QUERY_STATE_NEXT",
            Self::QueryStateClose => "QUERY_STATE_CLOSE",
            Self::GetQueryResult => "GET_QUERY_RESULT",
            Self::GetHistoryForKey => "GET_HISTORY_FOR_KEY",
            Self::InvokeChaincode => "INVOKE_CHAINCODE",
        }
    }

    /// Kinds that answer a correlated request.
    #[must_use]
    pub const fn is_reply(self) -> bool {
        matches!(self, Self::Response | Self::Error)
    }

    /// Kinds that must carry a transaction id. Handshake messages and
    /// keep-alives are session-wide.
    #[must_use]
    pub const fn requires_txid(self) -> bool {
        !matches!(
            self,
            Self::Register | Self::Registered | Self::Ready | Self::Keepalive
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event a chaincode attaches to its `COMPLETED` message.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    /// Name of the chaincode that emitted the event.
    pub chaincode_id: String,
    /// Transaction the event belongs to.
    pub txid: String,
    /// Application-defined event name.
    pub event_name: String,
    /// Opaque event body.
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
}

/// The protocol message envelope.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Decides how `payload` is interpreted.
    pub kind: MessageKind,

    /// Kind-specific body.
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,

    /// Correlates a request with its unique reply.
    pub txid: String,

    /// Signed proposal that triggered this cycle, passed through unmodified.
    #[serde_as(as = "Option<Bytes>")]
    pub proposal: Option<Vec<u8>>,

    /// Event emitted by the chaincode, passed through unmodified.
    pub event: Option<ChaincodeEvent>,
}

impl Message {
    /// Build a message with no proposal and no event.
    pub fn new(kind: MessageKind, txid: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            txid: txid.into(),
            proposal: None,
            event: None,
        }
    }

    /// Build an `ERROR` message whose payload is the given text.
    pub fn error(txid: impl Into<String>, text: impl AsRef<str>) -> Self {
        Self::new(MessageKind::Error, txid, text.as_ref().as_bytes().to_vec())
    }

    /// Attach a proposal.
    #[must_use]
    pub fn with_proposal(mut self, proposal: Vec<u8>) -> Self {
        self.proposal = Some(proposal);
        self
    }

    /// Attach a chaincode event.
    #[must_use]
    pub fn with_event(mut self, event: Option<ChaincodeEvent>) -> Self {
        self.event = event;
        self
    }

    /// Payload interpreted as UTF-8 text (lossy).
    #[must_use]
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Serialize the whole envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        crate::codec::encode(self)
    }

    /// Deserialize a whole envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        crate::codec::decode(bytes)
    }
}
