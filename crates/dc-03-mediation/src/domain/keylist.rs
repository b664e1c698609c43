//! Keylist entries exchanged in `keylist-update` and its response

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeylistUpdateAction {
    Add,
    Remove,
}

/// Outcome the mediator reports for one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeylistUpdateResult {
    ClientError,
    ServerError,
    NoChange,
    Success,
}

impl KeylistUpdateResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::NoChange => "no_change",
            Self::Success => "success",
        }
    }
}

/// One requested change to the mediator's routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistUpdate {
    pub recipient_key: String,
    pub action: KeylistUpdateAction,
}

impl KeylistUpdate {
    pub fn add(recipient_key: impl Into<String>) -> Self {
        Self {
            recipient_key: recipient_key.into(),
            action: KeylistUpdateAction::Add,
        }
    }

    pub fn remove(recipient_key: impl Into<String>) -> Self {
        Self {
            recipient_key: recipient_key.into(),
            action: KeylistUpdateAction::Remove,
        }
    }
}

/// An update as applied by the mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistUpdated {
    pub recipient_key: String,
    pub action: KeylistUpdateAction,
    pub result: KeylistUpdateResult,
}

impl KeylistUpdated {
    pub fn is_success(&self) -> bool {
        self.result == KeylistUpdateResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_updated_wire_format() {
        let updated = KeylistUpdated {
            recipient_key: "8HH5gYEeNc3z7PYXmd54d4x6qAfCNrqQqEB3nS7Zfu7K".into(),
            action: KeylistUpdateAction::Remove,
            result: KeylistUpdateResult::NoChange,
        };
        assert_eq!(
            serde_json::to_value(&updated).unwrap(),
            json!({
                "recipient_key": "8HH5gYEeNc3z7PYXmd54d4x6qAfCNrqQqEB3nS7Zfu7K",
                "action": "remove",
                "result": "no_change"
            })
        );
        assert!(!updated.is_success());
    }
}
