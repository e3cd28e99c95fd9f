//! # Shim Configuration
//!
//! Session parameters with defaults, environment overrides and validation.
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `SNAP_CHAINCODE_NAME` | `snap` | `chaincode_name` |
//! | `SNAP_PEER_ADDRESS` | `127.0.0.1:7052` | `peer_address` |
//! | `SNAP_REGISTRATION_TIMEOUT_SECS` | `10` | `registration_timeout` |
//! | `SNAP_INBOUND_BUFFER` | `1000` | `inbound_buffer` |
//! | `SNAP_MAX_PENDING` | `10000` | `max_pending` |
//! | `SNAP_MAX_FRAME_SIZE` | `104857600` | `max_frame_size` |

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Chaincode name is empty.
    #[error("chaincode name must not be empty")]
    EmptyChaincodeName,

    /// Peer address is empty.
    #[error("peer address must not be empty")]
    EmptyPeerAddress,

    /// A duration that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    /// A capacity that must be positive is zero.
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// Name sent in the REGISTER handshake.
    pub chaincode_name: String,
    /// `host:port` of the peer's chaincode listener.
    pub peer_address: String,
    /// How long `Session::start` waits for REGISTERED.
    pub registration_timeout: Duration,
    /// Depth of the queue between the stream reader and the dispatch loop.
    pub inbound_buffer: usize,
    /// Maximum requests awaiting a reply at once.
    pub max_pending: usize,
    /// Largest frame accepted or sent by the TCP transport.
    pub max_frame_size: usize,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            chaincode_name: "snap".to_string(),
            peer_address: "127.0.0.1:7052".to_string(),
            registration_timeout: Duration::from_secs(10),
            inbound_buffer: snap_stream::DEFAULT_CHANNEL_CAPACITY,
            max_pending: 10_000,
            max_frame_size: snap_stream::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl ShimConfig {
    /// Configuration for a named chaincode, other fields default.
    #[must_use]
    pub fn for_chaincode(name: impl Into<String>) -> Self {
        Self {
            chaincode_name: name.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `SNAP_*` environment variables.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = env::var("SNAP_CHAINCODE_NAME") {
            config.chaincode_name = name;
        }
        if let Ok(addr) = env::var("SNAP_PEER_ADDRESS") {
            config.peer_address = addr;
        }
        if let Some(secs) = parse_var::<u64>("SNAP_REGISTRATION_TIMEOUT_SECS") {
            config.registration_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var("SNAP_INBOUND_BUFFER") {
            config.inbound_buffer = n;
        }
        if let Some(n) = parse_var("SNAP_MAX_PENDING") {
            config.max_pending = n;
        }
        if let Some(n) = parse_var("SNAP_MAX_FRAME_SIZE") {
            config.max_frame_size = n;
        }

        config
    }

    /// Reject configurations a session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chaincode_name.trim().is_empty() {
            return Err(ConfigError::EmptyChaincodeName);
        }
        if self.peer_address.trim().is_empty() {
            return Err(ConfigError::EmptyPeerAddress);
        }
        if self.registration_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("registration_timeout"));
        }
        if self.inbound_buffer == 0 {
            return Err(ConfigError::ZeroCapacity("inbound_buffer"));
        }
        if self.max_pending == 0 {
            return Err(ConfigError::ZeroCapacity("max_pending"));
        }
        if self.max_frame_size == 0 {
            return Err(ConfigError::ZeroCapacity("max_frame_size"));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
