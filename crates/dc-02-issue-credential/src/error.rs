//! Error types for the Issue Credential protocol

use std::fmt;

use shared_storage::StorageError;
use shared_types::{ConnectionError, MessageError};
use thiserror::Error;

use crate::domain::CredentialState;

/// Reason codes carried by credential problem reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialProblemReportReason {
    IssuanceAbandoned,
}

impl CredentialProblemReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IssuanceAbandoned => "issuance-abandoned",
        }
    }
}

impl fmt::Display for CredentialProblemReportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue Credential errors
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(
        "Credential record {record_id} is in invalid state {current}. Valid states are: {}",
        format_states(.allowed)
    )]
    InvalidState {
        record_id: String,
        current: CredentialState,
        allowed: Vec<CredentialState>,
    },

    #[error("Credential record {record_id} uses protocol version {actual}, expected {expected}")]
    ProtocolVersion {
        record_id: String,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    NotFound(String),

    /// Operation the v1 protocol does not define
    #[error("{0}")]
    Unsupported(String),

    #[error("Attachment with id {attachment_id} not found in {message_type} message")]
    MissingAttachment {
        attachment_id: &'static str,
        message_type: &'static str,
    },

    /// Credential format handler rejected the payload
    #[error("Credential format error: {0}")]
    Format(String),

    /// Condition the peer must be told about with a problem report
    #[error("{message} ({reason})")]
    ProblemReport {
        message: String,
        reason: CredentialProblemReportReason,
    },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CredentialError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidState { .. } => "invalid-state",
            Self::ProtocolVersion { .. } => "protocol-version",
            Self::NotFound(_) => "not-found",
            Self::Unsupported(_) => "unsupported",
            Self::MissingAttachment { .. } => "missing-attachment",
            Self::Format(_) => "format",
            Self::ProblemReport { .. } => "problem-report",
            Self::Connection(_) => "connection",
            Self::Message(_) => "message",
            Self::Storage(_) => "storage",
        }
    }
}

fn format_states(states: &[CredentialState]) -> String {
    states
        .iter()
        .map(CredentialState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for credential operations
pub type CredentialResult<T> = Result<T, CredentialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = CredentialError::InvalidState {
            record_id: "cred-1".into(),
            current: CredentialState::OfferSent,
            allowed: vec![CredentialState::RequestReceived],
        };
        assert_eq!(
            err.to_string(),
            "Credential record cred-1 is in invalid state offer-sent. Valid states are: request-received"
        );
        assert_eq!(err.kind(), "invalid-state");
    }

    #[test]
    fn test_missing_attachment_message() {
        let err = CredentialError::MissingAttachment {
            attachment_id: "libindy-cred-offer-0",
            message_type: "offer-credential",
        };
        assert!(err.to_string().contains("libindy-cred-offer-0"));
    }
}
