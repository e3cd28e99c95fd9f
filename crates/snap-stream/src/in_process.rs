//! # In-Process Stream
//!
//! Two endpoints joined by a pair of bounded queues. Used when a snap runs
//! inside the peer process, and by every test that needs a peer stand-in.
//!
//! ```text
//!  ┌──────────────┐   a.sink ──queue──> b.source   ┌──────────────┐
//!  │  endpoint a  │                                │  endpoint b  │
//!  └──────────────┘   a.source <──queue── b.sink   └──────────────┘
//! ```

use async_trait::async_trait;
use snap_types::Message;
use tokio::sync::mpsc;
use tracing::debug;

use crate::duplex::{DuplexStream, MessageSink, MessageSource, StreamError};

/// Create two connected endpoints with the given per-direction capacity.
#[must_use]
pub fn duplex_pair(capacity: usize) -> (InProcessStream, InProcessStream) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    (
        InProcessStream::new(a_tx, a_rx),
        InProcessStream::new(b_tx, b_rx),
    )
}

/// One endpoint of an in-process duplex pair.
pub struct InProcessStream {
    sink: InProcessSink,
    source: InProcessSource,
}

impl InProcessStream {
    fn new(tx: mpsc::Sender<Message>, rx: mpsc::Receiver<Message>) -> Self {
        Self {
            sink: InProcessSink { tx: Some(tx) },
            source: InProcessSource { rx },
        }
    }

    /// Split into concrete halves without boxing.
    #[must_use]
    pub fn into_parts(self) -> (InProcessSink, InProcessSource) {
        (self.sink, self.source)
    }
}

impl DuplexStream for InProcessStream {
    fn split(self) -> (Box<dyn MessageSink>, Box<dyn MessageSource>) {
        (Box::new(self.sink), Box::new(self.source))
    }
}

/// Write half of an in-process endpoint.
pub struct InProcessSink {
    tx: Option<mpsc::Sender<Message>>,
}

impl InProcessSink {
    /// Whether `close_send` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

#[async_trait]
impl MessageSink for InProcessSink {
    async fn send(&mut self, msg: Message) -> Result<(), StreamError> {
        let tx = self.tx.as_ref().ok_or(StreamError::Closed)?;
        tx.send(msg).await.map_err(|_| StreamError::Closed)
    }

    async fn close_send(&mut self) -> Result<(), StreamError> {
        if self.tx.take().is_some() {
            debug!("in-process stream write side closed");
        }
        Ok(())
    }
}

/// Read half of an in-process endpoint.
pub struct InProcessSource {
    rx: mpsc::Receiver<Message>,
}

#[async_trait]
impl MessageSource for InProcessSource {
    async fn recv(&mut self) -> Result<Option<Message>, StreamError> {
        Ok(self.rx.recv().await)
    }
}
