//! Prometheus counters for the shim protocol engine.
//!
//! All metrics follow the naming convention: `snap_shim_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: messages in and out by kind, illegal transitions, invocations
//! - **Gauge**: correlation slots currently awaiting a reply
//! - **Histogram**: request round-trip time by request kind
//!
//! Nothing is exported; [`encode_metrics`] renders the text format for
//! whoever embeds the shim.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Histogram, HistogramVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // STREAM TRAFFIC
    // =========================================================================

    /// Messages received from the peer, by kind
    pub static ref MESSAGES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("snap_shim_messages_received_total", "Messages received from the peer"),
        &["kind"]
    ).expect("metric creation failed");

    /// Messages written to the peer, by kind
    pub static ref MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("snap_shim_messages_sent_total", "Messages written to the peer"),
        &["kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // PROTOCOL STATE
    // =========================================================================

    /// Messages that had no transition from the current state
    pub static ref ILLEGAL_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("snap_shim_illegal_transitions_total", "Messages rejected by the state machine"),
        &["state", "kind"]  // state: created/established/init/ready
    ).expect("metric creation failed");

    /// Correlation slots currently awaiting a reply
    pub static ref PENDING_REQUESTS: IntGauge = IntGauge::new(
        "snap_shim_pending_requests",
        "Requests awaiting a correlated reply"
    ).expect("metric creation failed");

    /// Round-trip time of a correlated request
    pub static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "snap_shim_request_duration_seconds",
            "Time from writing a request to receiving its reply"
        ).buckets(exponential_buckets(0.0001, 2.0, 16).expect("bucket layout")),
        &["kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // CHAINCODE
    // =========================================================================

    /// Chaincode invocations by phase and outcome
    pub static ref CHAINCODE_INVOCATIONS: CounterVec = CounterVec::new(
        Opts::new("snap_shim_chaincode_invocations_total", "Chaincode init/invoke calls"),
        &["phase", "outcome"]  // phase: init/transaction, outcome: completed/error/panic
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics already present are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MESSAGES_RECEIVED.clone()),
        Box::new(MESSAGES_SENT.clone()),
        Box::new(ILLEGAL_TRANSITIONS.clone()),
        Box::new(PENDING_REQUESTS.clone()),
        Box::new(REQUEST_DURATION.clone()),
        Box::new(CHAINCODE_INVOCATIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }

    /// Start a timer for one label of [`REQUEST_DURATION`].
    pub fn request(kind: &str) -> Self {
        Self::new(&REQUEST_DURATION.with_label_values(&[kind]))
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
