//! # Snap Shim
//!
//! Protocol engine that lets an external process act as a chaincode for a
//! blockchain peer, over one duplex message stream.
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Protocol state machine | [`domain::state`] | Static `(state, kind) -> state` table with effects |
//! | Transition sequencer | [`session`] | Single loop applying queued transitions in order |
//! | Correlation registry | [`registry`] | One reply slot per transaction id |
//! | Serial writer | [`writer`] | One in-flight write at a time |
//! | Request/response driver | [`driver`] | `send_and_await` |
//! | Operation handlers | [`handlers`] | Typed state, query and invoke requests |
//! | Dispatch loop | [`session`] | Routes inbound messages |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snap_shim::{Session, ShimConfig};
//! use snap_stream::TcpMessageStream;
//!
//! let config = ShimConfig::from_env();
//! let stream = TcpMessageStream::connect(&config.peer_address).await?;
//! let session = Session::start(stream, Arc::new(MyChaincode), config).await?;
//! let reason = session.run().await;
//! ```

#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod domain;
pub mod driver;
pub mod executor;
pub mod handlers;
pub mod ports;
pub mod registry;
pub mod session;
pub mod stub;
pub mod writer;

pub use config::{ConfigError, ShimConfig};
pub use domain::{
    create_composite_key, split_composite_key, Effect, ProtocolState, ShimError,
    TransitionRequest,
};
pub use driver::RequestDriver;
pub use executor::CyclePhase;
pub use handlers::OperationHandlers;
pub use ports::Chaincode;
pub use registry::{CorrelationRegistry, RegistryStats};
pub use session::Session;
pub use stub::{ChaincodeStub, HistoryQueryIterator, QueryIterator, StateQueryIterator};
pub use writer::SerialWriter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
