//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and counters.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `snap_shim=debug,info`.
    pub log_level: String,

    /// Whether to write logs to stderr at all.
    pub console_output: bool,

    /// Whether to emit JSON lines instead of human-readable output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "snap".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SNAP_SERVICE_NAME`: Service name (default: snap)
    /// - `SNAP_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `SNAP_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `SNAP_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("SNAP_SERVICE_NAME").unwrap_or_else(|_| "snap".to_string()),

            log_level: env::var("SNAP_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("SNAP_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("SNAP_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    /// Configuration for a named snap.
    pub fn for_snap(snap_name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("snap-{}", snap_name);
        config
    }
}
