//! # Agent Telemetry
//!
//! Logging and metrics for DIDComm agents.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by `tracing-subscriber`, pretty for
//!   development or JSON for log shippers.
//! - **Metrics**: Prometheus counters for inbound/outbound messages, state
//!   transitions and handler failures, scraped via [`encode_metrics`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Exchanges logged and counted from here on.
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DIDCOMM_SERVICE_NAME` | `didcomm-agent` | Service name attached to logs |
//! | `RUST_LOG` | `info` | Log level filter |
//! | `DIDCOMM_JSON_LOGS` | `false` | JSON formatted logs |
//! | `DIDCOMM_METRICS` | `true` | Register Prometheus metrics |

mod config;
mod logging;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, HANDLER_ERRORS, INBOUND_MESSAGES,
    OUTBOUND_DROPPED, OUTBOUND_MESSAGES, PROBLEM_REPORTS_SENT, REGISTRY, STATE_TRANSITIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and, when enabled, metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = if config.metrics_enabled {
        Some(register_metrics()?)
    } else {
        None
    };

    tracing_setup::init_tracing(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        metrics = config.metrics_enabled,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: Option<MetricsHandle>,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for creating a span scoped to one exchange.
///
/// # Example
///
/// ```rust,ignore
/// let _span = exchange_span!("process_perform", protocol = "action-menu", thread_id = %thid);
/// ```
#[macro_export]
macro_rules! exchange_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "didcomm-agent");
    }

    #[test]
    fn test_metric_inc_macro() {
        metric_inc!(OUTBOUND_DROPPED);
        metric_inc!(HANDLER_ERRORS, &["action-menu", "invalid-state"]);
        assert!(OUTBOUND_DROPPED.get() >= 1.0);
        assert!(
            HANDLER_ERRORS
                .with_label_values(&["action-menu", "invalid-state"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_init_without_metrics_twice_fails_second_time() {
        let config = TelemetryConfig {
            metrics_enabled: false,
            ..TelemetryConfig::default()
        };
        let _first = init_telemetry(config.clone());
        // A global subscriber can only be installed once per process.
        assert!(matches!(
            init_telemetry(config),
            Err(TelemetryError::TracingInit(_))
        ));
    }
}
