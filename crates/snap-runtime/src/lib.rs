//! # Snap Runtime
//!
//! Hosts one snap as an external chaincode process.
//!
//! ## Startup Sequence
//!
//! 1. Load `ShimConfig` and `TelemetryConfig` from the environment
//! 2. Initialize logging and metrics
//! 3. Dial the peer over TCP
//! 4. Register the snap (`Session::start`)
//! 5. Run the session until the peer closes the stream or shutdown is signalled

pub mod snaps;

use anyhow::{Context, Result};
use snap_shim::{Chaincode, Session, ShimConfig, ShimError};
use snap_stream::TcpMessageStream;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Why [`SnapRuntime::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The peer closed the stream.
    PeerClosed,
    /// [`SnapRuntime::shutdown`] was called.
    Shutdown,
}

/// Process-level host for one snap.
pub struct SnapRuntime {
    config: ShimConfig,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
}

impl SnapRuntime {
    /// Create a runtime with configuration.
    #[must_use]
    pub fn new(config: ShimConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Connect to the peer and serve `chaincode` until the stream ends or
    /// shutdown is signalled.
    pub async fn run(&self, chaincode: Arc<dyn Chaincode>) -> Result<ExitReason> {
        self.config
            .validate()
            .context("invalid shim configuration")?;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let stream =
            TcpMessageStream::connect_with_limit(&self.config.peer_address, self.config.max_frame_size)
                .await
                .with_context(|| format!("connecting to peer at {}", self.config.peer_address))?;
        info!(peer = %self.config.peer_address, "connected to peer");

        let session = Session::start(stream, chaincode, self.config.clone())
            .await
            .context("registering with peer")?;

        let shutdown = async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
            info!("shutdown requested");
        };
        match session.run_until(shutdown).await {
            ShimError::Disconnected => Ok(ExitReason::PeerClosed),
            ShimError::Shutdown => Ok(ExitReason::Shutdown),
            other => {
                error!(error = %other, "session failed");
                Err(anyhow::Error::new(other).context("session terminated"))
            }
        }
    }

    /// Signal [`run`](Self::run) to stop.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
