//! # Snap Runtime Binary
//!
//! Runs the bundled key/value snap against the peer named by
//! `SNAP_PEER_ADDRESS`. See `snap_shim::config` and `snap_telemetry` for the
//! environment variables read at startup.

use std::sync::Arc;

use anyhow::{Context, Result};
use snap_runtime::snaps::KvSnap;
use snap_runtime::{ExitReason, SnapRuntime};
use snap_shim::ShimConfig;
use snap_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = ShimConfig::from_env();
    let telemetry = TelemetryConfig::for_snap(&config.chaincode_name);

    // Initialize logging
    init_telemetry(&telemetry).context("initializing telemetry")?;
    info!(
        chaincode = %config.chaincode_name,
        peer = %config.peer_address,
        version = snap_shim::VERSION,
        "starting snap runtime"
    );

    let runtime = Arc::new(SnapRuntime::new(config));
    let signal = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                runtime.shutdown();
            }
        })
    };

    let reason = runtime.run(Arc::new(KvSnap::new())).await?;
    signal.abort();

    match reason {
        ExitReason::PeerClosed => info!("peer closed the stream"),
        ExitReason::Shutdown => info!("interrupted"),
    }
    Ok(())
}
