//! # Snap Stream - Duplex Message Transport
//!
//! The bidirectional channel a snap process uses to talk to its peer.
//!
//! ## Contract
//!
//! ```text
//!            split()
//!  DuplexStream ──────┬──> MessageSink    send(msg), close_send()
//!                     └──> MessageSource  recv() -> Option<msg>
//! ```
//!
//! Exactly one task owns each half. Serializing concurrent writers and
//! routing replies are the protocol engine's job, not the stream's.
//!
//! ## Realizations
//!
//! - [`InProcessStream`]: paired bounded queues, for in-process snaps and tests
//! - [`TcpMessageStream`]: length-prefixed frames over a TCP connection

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod duplex;
pub mod in_process;
pub mod tcp;

pub use duplex::{DuplexStream, MessageSink, MessageSource, StreamError};
pub use in_process::{duplex_pair, InProcessSink, InProcessSource, InProcessStream};
pub use tcp::{TcpMessageStream, TcpSink, TcpSource};

/// Default queue depth of each direction of an in-process pair.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Default upper bound on a single TCP frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;
