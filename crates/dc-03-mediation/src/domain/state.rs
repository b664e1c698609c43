//! Mediation states and roles

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a mediation relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediationState {
    Requested,
    Granted,
    Denied,
}

impl MediationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for MediationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the relationship a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediationRole {
    Mediator,
    Recipient,
}

impl MediationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mediator => "mediator",
            Self::Recipient => "recipient",
        }
    }
}

impl fmt::Display for MediationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(MediationState::Granted).unwrap(),
            "granted"
        );
        let role: MediationRole = serde_json::from_str("\"recipient\"").unwrap();
        assert_eq!(role, MediationRole::Recipient);
        assert_eq!(MediationRole::Mediator.to_string(), "mediator");
    }
}
