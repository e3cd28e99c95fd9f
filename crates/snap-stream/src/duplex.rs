//! # Duplex Stream Contract
//!
//! A bidirectional channel of discrete messages, split into a write half and
//! a read half so that exactly one task can own each.

use async_trait::async_trait;
use snap_types::{CodecError, Message};
use thiserror::Error;

/// Errors from stream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The write side was closed, locally or by the remote end.
    #[error("stream closed")]
    Closed,

    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame did not hold a valid message.
    #[error("invalid frame: {0}")]
    Codec(#[from] CodecError),

    /// A frame was larger than the configured limit.
    #[error("frame exceeds limit of {max} bytes")]
    FrameTooLarge { max: usize },
}

/// Write half of a duplex stream.
#[async_trait]
pub trait MessageSink: Send {
    /// Send one message. Completes once the message is handed to the transport.
    async fn send(&mut self, msg: Message) -> Result<(), StreamError>;

    /// Close the write side. Further sends fail with [`StreamError::Closed`].
    async fn close_send(&mut self) -> Result<(), StreamError>;
}

/// Read half of a duplex stream.
#[async_trait]
pub trait MessageSource: Send {
    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(msg))` - The next message
    /// - `Ok(None)` - The remote end closed the stream cleanly
    /// - `Err(_)` - The transport failed
    async fn recv(&mut self) -> Result<Option<Message>, StreamError>;
}

/// A stream that can be split into independently owned halves.
pub trait DuplexStream: Send + 'static {
    /// Split into (write half, read half).
    fn split(self) -> (Box<dyn MessageSink>, Box<dyn MessageSource>);
}
