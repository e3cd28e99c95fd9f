//! # Request/Response Driver
//!
//! "Send a message, then wait for exactly one correlated reply or a send
//! failure", composed from the [`SerialWriter`] and the
//! [`CorrelationRegistry`].
//!
//! ```text
//!  caller ── create_slot(txid) ──> registry
//!    │ ───── write(msg) ─────────> serial writer ──> peer
//!    │                                                │
//!    │ <──── oneshot ──────────── registry <── dispatch loop <── reply
//!    └────── delete_slot(txid) (always, via guard)
//! ```
//!
//! The write and the wait run together; whichever settles first decides.
//! A failed write returns at once. A closed slot (the session tore down the
//! registry) returns `Disconnected` even while the write is still blocked.

use snap_telemetry::HistogramTimer;
use snap_types::{Message, MessageKind};
use std::sync::Arc;
use tracing::debug;

use crate::domain::ShimError;
use crate::registry::CorrelationRegistry;
use crate::writer::SerialWriter;

/// Expected reply kinds, as reported in [`ShimError::UnexpectedReply`].
pub const EXPECTED_REPLY: &str = "RESPONSE or ERROR";

/// Deletes a slot when the request that owns it ends, however it ends.
struct SlotGuard<'a> {
    registry: &'a CorrelationRegistry,
    txid: &'a str,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.registry.delete_slot(self.txid);
    }
}

/// Shared handle for issuing correlated requests on one session.
#[derive(Clone)]
pub struct RequestDriver {
    writer: Arc<SerialWriter>,
    registry: Arc<CorrelationRegistry>,
}

impl RequestDriver {
    #[must_use]
    pub fn new(writer: Arc<SerialWriter>, registry: Arc<CorrelationRegistry>) -> Self {
        Self { writer, registry }
    }

    /// Write `msg` and wait for the reply correlated by its transaction id.
    ///
    /// # Errors
    ///
    /// - `DuplicateSlot` / `TooManyPending` / `RegistryClosed` - no slot could be opened
    /// - `Transport` - the write failed
    /// - `Disconnected` - the session ended before a reply arrived
    /// - `UnexpectedReply` - the reply was neither RESPONSE nor ERROR
    pub async fn send_and_await(&self, msg: Message) -> Result<Message, ShimError> {
        let txid = msg.txid.clone();
        let kind = msg.kind;

        let mut rx = self.registry.create_slot(&txid)?;
        let _slot = SlotGuard {
            registry: &self.registry,
            txid: &txid,
        };
        let _timer = HistogramTimer::request(kind.as_str());

        let reply = tokio::select! {
            biased;
            reply = &mut rx => reply,
            written = self.writer.write(msg) => {
                written?;
                rx.await
            }
        }
        .map_err(|_| ShimError::Disconnected)?;
        debug!(txid = %txid, request = %kind, reply = %reply.kind, "received reply");

        match reply.kind {
            MessageKind::Response | MessageKind::Error => Ok(reply),
            other => Err(ShimError::UnexpectedReply {
                kind: other,
                expected: EXPECTED_REPLY,
            }),
        }
    }

    /// Write without expecting a reply.
    pub async fn send(&self, msg: Message) -> Result<(), ShimError> {
        self.writer.write(msg).await
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    pub fn writer(&self) -> &Arc<SerialWriter> {
        &self.writer
    }
}
