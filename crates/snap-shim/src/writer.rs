//! # Serial Writer
//!
//! Sole owner of the stream's write half. Callers queue on an async mutex
//! held only across one physical write, so two messages never interleave.
//!
//! Closing flips a watch flag first. Every queued or in-flight write sees it
//! and gives up the mutex, so `close` never waits behind a write the peer
//! has stopped draining.

use snap_stream::{MessageSink, StreamError};
use snap_telemetry::MESSAGES_SENT;
use snap_types::Message;
use tokio::sync::{watch, Mutex};
use tracing::{debug, trace};

use crate::domain::ShimError;

/// Serialized access to a [`MessageSink`].
pub struct SerialWriter {
    sink: Mutex<Box<dyn MessageSink>>,
    closed: watch::Sender<bool>,
}

impl SerialWriter {
    /// Take ownership of a write half.
    #[must_use]
    pub fn new(sink: Box<dyn MessageSink>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            sink: Mutex::new(sink),
            closed,
        }
    }

    /// Write one message, waiting for any in-flight write to finish first.
    ///
    /// Fails with `Transport(Closed)` once [`close`](Self::close) has begun,
    /// including for a write that was already waiting or sending.
    pub async fn write(&self, msg: Message) -> Result<(), ShimError> {
        let kind = msg.kind;
        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(StreamError::Closed.into());
        }
        trace!(txid = %msg.txid, %kind, "writing message");

        let send = async {
            let mut sink = self.sink.lock().await;
            sink.send(msg).await
        };
        tokio::select! {
            biased;
            _ = async { let _ = closed.wait_for(|c| *c).await; } => {
                debug!(%kind, "write abandoned, writer closing");
                Err(StreamError::Closed.into())
            }
            sent = send => {
                sent?;
                MESSAGES_SENT.with_label_values(&[kind.as_str()]).inc();
                Ok(())
            }
        }
    }

    /// Abandon pending writes and close the write side of the stream.
    pub async fn close(&self) -> Result<(), ShimError> {
        self.closed.send_replace(true);
        let mut sink = self.sink.lock().await;
        sink.close_send().await?;
        debug!("serial writer closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}
