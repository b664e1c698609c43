//! Prometheus metrics for DIDComm agents.
//!
//! All metrics follow the naming convention: `didcomm_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MESSAGE METRICS
    // =========================================================================

    /// Inbound messages by protocol and message name
    pub static ref INBOUND_MESSAGES: CounterVec = CounterVec::new(
        Opts::new("didcomm_messages_inbound_total", "Inbound messages dispatched"),
        &["protocol", "message"]
    ).expect("metric creation failed");

    /// Outbound messages by protocol and message name
    pub static ref OUTBOUND_MESSAGES: CounterVec = CounterVec::new(
        Opts::new("didcomm_messages_outbound_total", "Outbound messages handed to the sender"),
        &["protocol", "message"]
    ).expect("metric creation failed");

    /// Outbound messages dropped for lack of a destination
    pub static ref OUTBOUND_DROPPED: Counter = Counter::new(
        "didcomm_messages_dropped_total",
        "Auto-responses dropped because no connection or service was available"
    ).expect("metric creation failed");

    // =========================================================================
    // EXCHANGE METRICS
    // =========================================================================

    /// State transitions by protocol and resulting state
    pub static ref STATE_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("didcomm_exchange_transitions_total", "Exchange state transitions"),
        &["protocol", "state"]
    ).expect("metric creation failed");

    /// Problem reports sent in response to failed inbound messages
    pub static ref PROBLEM_REPORTS_SENT: CounterVec = CounterVec::new(
        Opts::new("didcomm_problem_reports_sent_total", "Problem reports sent"),
        &["protocol", "code"]
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Handler errors by protocol and error kind
    pub static ref HANDLER_ERRORS: CounterVec = CounterVec::new(
        Opts::new("didcomm_handler_errors_total", "Errors returned by message handlers"),
        &["protocol", "kind"]
    ).expect("metric creation failed");
}

/// Keeps the registry alive for the lifetime of the telemetry guard.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(INBOUND_MESSAGES.clone()),
        Box::new(OUTBOUND_MESSAGES.clone()),
        Box::new(OUTBOUND_DROPPED.clone()),
        Box::new(STATE_TRANSITIONS.clone()),
        Box::new(PROBLEM_REPORTS_SENT.clone()),
        Box::new(HANDLER_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
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
