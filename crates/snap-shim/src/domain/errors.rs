//! # Domain Errors
//!
//! Error taxonomy of the shim protocol engine.
//!
//! | Class | Variants | Session survives |
//! |-------|----------|------------------|
//! | Malformed payload | `MalformedPayload` | yes |
//! | Illegal transition | `IllegalTransition` | yes |
//! | Correlation violation | `DuplicateSlot`, `UnknownTransaction`, `UnexpectedReply`, `TooManyPending` | yes |
//! | Transport failure | `Transport`, `Disconnected`, `RegistryClosed` | no |
//! | Nested invocation | `NestedInvocation` | yes |

use snap_stream::StreamError;
use snap_types::{CodecError, MessageKind};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::state::ProtocolState;

/// Shim error types.
#[derive(Debug, Error)]
pub enum ShimError {
    /// A kind-specific payload failed to (de)serialize.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] CodecError),

    /// Message kind not legal in the current state.
    #[error(
        "[{txid}] chaincode handler cannot handle message ({kind}) with payload size ({payload_size}) while in state: {state}"
    )]
    IllegalTransition {
        txid: String,
        kind: MessageKind,
        payload_size: usize,
        state: ProtocolState,
    },

    /// A request is already pending for this transaction id.
    #[error("[{0}] a request is already pending for this transaction")]
    DuplicateSlot(String),

    /// A reply arrived for a transaction id nobody is waiting on.
    #[error("[{0}] no pending request for this transaction")]
    UnknownTransaction(String),

    /// The correlated reply had a kind other than the expected set.
    #[error("received unexpected message type {kind}, expected {expected}")]
    UnexpectedReply {
        kind: MessageKind,
        expected: &'static str,
    },

    /// The registry was torn down with the session.
    #[error("correlation registry is closed")]
    RegistryClosed,

    /// The configured bound on in-flight requests was reached.
    #[error("too many pending requests (limit {0})")]
    TooManyPending(usize),

    /// Writing to or reading from the stream failed.
    #[error("transport error: {0}")]
    Transport(#[from] StreamError),

    /// The stream ended while the request was in flight.
    #[error("stream disconnected")]
    Disconnected,

    /// The session was stopped from this side.
    #[error("session shut down")]
    Shutdown,

    /// A nested chaincode call did not complete successfully.
    #[error("{0}")]
    NestedInvocation(String),

    /// The peer answered a request with ERROR.
    #[error("{0}")]
    Chaincode(String),

    /// No handshake reply within the registration timeout.
    #[error("registration timed out after {0:?}")]
    RegistrationTimeout(Duration),

    /// The peer answered the handshake with something other than REGISTERED.
    #[error("registration failed: {0}")]
    Registration(String),

    /// An inbound message of a correlated kind carried no transaction id.
    #[error("{0} message requires a transaction id")]
    MissingTxid(MessageKind),

    /// Caller-supplied argument rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Session configuration rejected at start.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ShimError {
    /// Transport-class errors end the session; everything else is answered
    /// over the stream or returned to a single caller.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Disconnected | Self::RegistryClosed
        )
    }
}
