//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to logs
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to register Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "didcomm-agent".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DIDCOMM_SERVICE_NAME`: Service name (default: didcomm-agent)
    /// - `RUST_LOG`: Log level (default: info)
    /// - `DIDCOMM_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `DIDCOMM_METRICS`: Register metrics (default: true)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("DIDCOMM_SERVICE_NAME")
                .unwrap_or_else(|_| "didcomm-agent".to_string()),

            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("DIDCOMM_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            metrics_enabled: env::var("DIDCOMM_METRICS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    /// Configuration for one named agent, e.g. in a multi-agent demo.
    pub fn for_agent(label: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("{}-{}", config.service_name, label.to_lowercase());
        config
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "didcomm-agent");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_for_agent() {
        let config = TelemetryConfig::for_agent("Faber");
        assert!(config.service_name.ends_with("-faber"));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("no"));
    }
}
