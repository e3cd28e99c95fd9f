//! # Snap Telemetry
//!
//! Logging and counters for snap processes.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events through an `EnvFilter`, rendered as JSON lines
//!   or human-readable text
//! - **Metrics**: Prometheus counters for the shim protocol engine, encoded on
//!   demand
//!
//! ## Usage
//!
//! ```rust,ignore
//! use snap_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SNAP_SERVICE_NAME` | `snap` | Service name in log lines |
//! | `SNAP_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `SNAP_JSON_LOGS` | `false` | JSON output (default on in containers) |
//! | `SNAP_CONSOLE_OUTPUT` | `true` | Write logs to stderr |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, CHAINCODE_INVOCATIONS, ILLEGAL_TRANSITIONS,
    MESSAGES_RECEIVED, MESSAGES_SENT, PENDING_REQUESTS, REQUEST_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
