//! # Agent Configuration
//!
//! Unified configuration for the agent and its protocol modules.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `DIDCOMM_AGENT_LABEL` | `didcomm-agent` | `identity.label` |
//! | `DIDCOMM_ENDPOINTS` | `http://localhost:3000` | `identity.endpoints` (comma separated) |
//! | `DIDCOMM_AUTO_ACCEPT_CREDENTIALS` | `never` | `credentials.auto_accept_credentials` |
//! | `DIDCOMM_ISSUER_DID` | `did:example:issuer` | `credentials.issuer_did` |
//! | `DIDCOMM_AUTO_ACCEPT_MEDIATION` | `false` | `mediator.auto_accept_mediation_requests` |
//! | `DIDCOMM_MEDIATOR_ENDPOINT` | unset | `mediator.endpoint` |
//! | `DIDCOMM_MEDIATOR_ROUTING_KEYS` | empty | `mediator.routing_keys` (comma separated) |
//! | `DIDCOMM_BUS_CAPACITY` | `1000` | `bus.channel_capacity` |
//!
//! Unparseable values are ignored with a warning and the default is kept.

use dc_02_issue_credential::AutoAcceptCredential;
use dc_03_mediation::MediatorRouting;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use thiserror::Error;
use tracing::warn;

/// Complete agent configuration.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    /// Who the agent is and where it can be reached.
    pub identity: AgentIdentity,
    /// Issue credential module.
    pub credentials: CredentialsModuleConfig,
    /// Coordinate mediation module, mediator side.
    pub mediator: MediatorModuleConfig,
    /// Event bus.
    pub bus: BusConfig,
}

impl AgentConfig {
    /// Defaults overridden by `DIDCOMM_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(label) = lookup("DIDCOMM_AGENT_LABEL") {
            config.identity.label = label;
        }
        if let Some(endpoints) = lookup("DIDCOMM_ENDPOINTS") {
            config.identity.endpoints = split_list(&endpoints);
        }
        if let Some(value) = lookup("DIDCOMM_AUTO_ACCEPT_CREDENTIALS") {
            match value.parse() {
                Ok(policy) => config.credentials.auto_accept_credentials = policy,
                Err(err) => warn!(value = %value, error = %err, "Ignoring DIDCOMM_AUTO_ACCEPT_CREDENTIALS"),
            }
        }
        if let Some(did) = lookup("DIDCOMM_ISSUER_DID") {
            config.credentials.issuer_did = did;
        }
        if let Some(value) = lookup("DIDCOMM_AUTO_ACCEPT_MEDIATION") {
            config.mediator.auto_accept_mediation_requests = parse_flag(&value);
        }
        if let Some(endpoint) = lookup("DIDCOMM_MEDIATOR_ENDPOINT") {
            config.mediator.endpoint = Some(endpoint);
        }
        if let Some(keys) = lookup("DIDCOMM_MEDIATOR_ROUTING_KEYS") {
            config.mediator.routing_keys = split_list(&keys);
        }
        if let Some(value) = lookup("DIDCOMM_BUS_CAPACITY") {
            match value.parse() {
                Ok(capacity) => config.bus.channel_capacity = capacity,
                Err(_) => warn!(value = %value, "Ignoring DIDCOMM_BUS_CAPACITY"),
            }
        }

        config
    }

    /// Check the configuration before the agent is built.
    ///
    /// # Errors
    ///
    /// - label is empty
    /// - an agent or mediator endpoint is not a `scheme://address` URI
    /// - bus capacity is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }
        for endpoint in &self.identity.endpoints {
            validate_endpoint(endpoint)?;
        }
        if let Some(endpoint) = &self.mediator.endpoint {
            validate_endpoint(endpoint)?;
        }
        if self.bus.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Agent label must not be empty")]
    EmptyLabel,

    #[error("Invalid endpoint '{0}': expected <scheme>://<address>")]
    InvalidEndpoint(String),

    #[error("Event bus channel capacity must be greater than zero")]
    ZeroChannelCapacity,
}

/// Agent identity.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    /// Label shown to peers.
    pub label: String,
    /// Endpoints peers deliver to.
    pub endpoints: Vec<String>,
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self {
            label: "didcomm-agent".to_string(),
            endpoints: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Issue credential module configuration.
#[derive(Debug, Clone)]
pub struct CredentialsModuleConfig {
    /// Agent-wide auto-accept policy; records may override it.
    pub auto_accept_credentials: AutoAcceptCredential,
    /// Issuer DID written into credentials this agent issues.
    pub issuer_did: String,
}

impl Default for CredentialsModuleConfig {
    fn default() -> Self {
        Self {
            auto_accept_credentials: AutoAcceptCredential::Never,
            issuer_did: "did:example:issuer".to_string(),
        }
    }
}

/// Mediator configuration.
#[derive(Debug, Clone, Default)]
pub struct MediatorModuleConfig {
    /// Grant mediation requests without asking the application.
    pub auto_accept_mediation_requests: bool,
    /// Endpoint announced in mediation grants. Unset means this agent does
    /// not act as a mediator.
    pub endpoint: Option<String>,
    /// Routing keys announced in mediation grants.
    pub routing_keys: Vec<String>,
}

impl MediatorModuleConfig {
    /// Routing to announce in grants, when configured.
    pub fn routing(&self) -> Option<MediatorRouting> {
        self.endpoint.as_ref().map(|endpoint| MediatorRouting {
            endpoint: Some(endpoint.clone()),
            routing_keys: self.routing_keys.clone(),
        })
    }
}

/// Event bus configuration.
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Events buffered per subscriber before it lags.
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint(endpoint.to_string());
    let (scheme, address) = endpoint.split_once("://").ok_or_else(invalid)?;
    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok || address.is_empty() || address.contains(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.identity.label, "didcomm-agent");
        assert_eq!(
            config.credentials.auto_accept_credentials,
            AutoAcceptCredential::Never
        );
        assert!(!config.mediator.auto_accept_mediation_requests);
        assert!(config.mediator.routing().is_none());
        assert_eq!(config.bus.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("DIDCOMM_AGENT_LABEL", "faber"),
            ("DIDCOMM_ENDPOINTS", "http://faber:8020, ws://faber:8021"),
            ("DIDCOMM_AUTO_ACCEPT_CREDENTIALS", "contentApproved"),
            ("DIDCOMM_ISSUER_DID", "did:example:faber"),
            ("DIDCOMM_AUTO_ACCEPT_MEDIATION", "true"),
            ("DIDCOMM_MEDIATOR_ENDPOINT", "http://mediator:3000"),
            ("DIDCOMM_MEDIATOR_ROUTING_KEYS", "key-1,key-2"),
            ("DIDCOMM_BUS_CAPACITY", "64"),
        ]));

        assert_eq!(config.identity.label, "faber");
        assert_eq!(
            config.identity.endpoints,
            vec!["http://faber:8020", "ws://faber:8021"]
        );
        assert_eq!(
            config.credentials.auto_accept_credentials,
            AutoAcceptCredential::ContentApproved
        );
        assert_eq!(config.credentials.issuer_did, "did:example:faber");
        assert!(config.mediator.auto_accept_mediation_requests);
        assert_eq!(config.bus.channel_capacity, 64);

        let routing = config.mediator.routing().unwrap();
        assert_eq!(routing.endpoint.as_deref(), Some("http://mediator:3000"));
        assert_eq!(routing.routing_keys, vec!["key-1", "key-2"]);
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("DIDCOMM_AUTO_ACCEPT_CREDENTIALS", "sometimes"),
            ("DIDCOMM_BUS_CAPACITY", "lots"),
        ]));
        assert_eq!(
            config.credentials.auto_accept_credentials,
            AutoAcceptCredential::Never
        );
        assert_eq!(config.bus.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let mut config = AgentConfig::default();
        config.identity.label = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyLabel));
    }

    #[test]
    fn test_validate_rejects_bad_endpoints() {
        for endpoint in ["localhost:3000", "http://", "://host", "1http://host", "http://a b"] {
            let mut config = AgentConfig::default();
            config.identity.endpoints = vec![endpoint.to_string()];
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidEndpoint(endpoint.to_string())),
                "{endpoint}"
            );
        }

        let mut config = AgentConfig::default();
        config.mediator.endpoint = Some("mediator".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = AgentConfig::default();
        config.bus.channel_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroChannelCapacity));
    }
}
