//! # Feature Registry
//!
//! Protocol modules declare `{id, roles}` per protocol version. The registry
//! answers discover-features style queries (`https://didcomm.org/issue-credential/*`).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A protocol the agent supports, with the roles it can play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Protocol {
    pub fn new(id: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            id: id.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Registry of supported protocols.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    protocols: RwLock<BTreeMap<String, Protocol>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protocol. Registering an id twice merges the roles.
    pub fn register(&self, protocol: Protocol) {
        let mut protocols = self.protocols.write();
        match protocols.get_mut(&protocol.id) {
            Some(existing) => {
                for role in protocol.roles {
                    if !existing.roles.contains(&role) {
                        existing.roles.push(role);
                    }
                }
            }
            None => {
                protocols.insert(protocol.id.clone(), protocol);
            }
        }
    }

    /// Protocols whose id matches `pattern`; a trailing `*` is a prefix wildcard.
    pub fn query(&self, pattern: &str) -> Vec<Protocol> {
        let protocols = self.protocols.read();
        match pattern.strip_suffix('*') {
            Some(prefix) => protocols
                .values()
                .filter(|p| p.id.starts_with(prefix))
                .cloned()
                .collect(),
            None => protocols.get(pattern).cloned().into_iter().collect(),
        }
    }

    /// Every registered protocol.
    pub fn all(&self) -> Vec<Protocol> {
        self.protocols.read().values().cloned().collect()
    }
}
