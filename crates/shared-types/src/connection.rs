//! # Connection Records
//!
//! Exchanges reference connections by id; they never own them. The DID
//! exchange protocol that produces these records lives outside this workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ConnectionError;
use crate::message::generate_id;

/// DID exchange state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DidExchangeState {
    Start,
    InvitationSent,
    InvitationReceived,
    RequestSent,
    RequestReceived,
    ResponseSent,
    ResponseReceived,
    Abandoned,
    Completed,
}

impl DidExchangeState {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::InvitationSent => "invitation-sent",
            Self::InvitationReceived => "invitation-received",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::ResponseSent => "response-sent",
            Self::ResponseReceived => "response-received",
            Self::Abandoned => "abandoned",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for DidExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pairwise connection with another agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub id: String,
    pub state: DidExchangeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_did: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// New connection in the given state.
    pub fn new(state: DidExchangeState) -> Self {
        Self {
            id: generate_id(),
            state,
            their_label: None,
            did: None,
            their_did: None,
            created_at: Utc::now(),
        }
    }

    /// Set the peer label.
    pub fn with_their_label(mut self, label: impl Into<String>) -> Self {
        self.their_label = Some(label.into());
        self
    }

    /// Ready connections have finished (or are finishing) DID exchange.
    pub fn is_ready(&self) -> bool {
        matches!(
            self.state,
            DidExchangeState::Completed | DidExchangeState::ResponseSent
        )
    }

    /// Fail unless the connection is ready.
    pub fn assert_ready(&self) -> Result<(), ConnectionError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ConnectionError::NotReady {
                connection_id: self.id.clone(),
                state: self.state.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_connection_is_ready() {
        let connection = ConnectionRecord::new(DidExchangeState::Completed);
        assert!(connection.assert_ready().is_ok());
    }

    #[test]
    fn test_pending_connection_is_not_ready() {
        let connection = ConnectionRecord::new(DidExchangeState::InvitationSent);
        let err = connection.assert_ready().unwrap_err();
        assert!(err.to_string().contains("invitation-sent"));
    }
}
