//! Error types for the Coordinate Mediation protocol

use shared_storage::StorageError;
use shared_types::{ConnectionError, MessageError};
use thiserror::Error;

use crate::domain::{MediationRole, MediationState};

/// Coordinate Mediation errors
#[derive(Debug, Error)]
pub enum MediationError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(
        "Mediation record {record_id} is in invalid state {current}. Valid states are: {}",
        format_states(.allowed)
    )]
    InvalidState {
        record_id: String,
        current: MediationState,
        allowed: Vec<MediationState>,
    },

    #[error("Mediation record {record_id} has invalid role {current}. Expected role {expected}")]
    InvalidRole {
        record_id: String,
        current: MediationRole,
        expected: MediationRole,
    },

    #[error("{0}")]
    NotFound(String),

    /// Grant requested before the mediator's routing was configured
    #[error("Mediator has not been initialized yet.")]
    MediatorNotInitialized,

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MediationError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidState { .. } => "invalid-state",
            Self::InvalidRole { .. } => "invalid-role",
            Self::NotFound(_) => "not-found",
            Self::MediatorNotInitialized => "not-initialized",
            Self::Connection(_) => "connection",
            Self::Message(_) => "message",
            Self::Storage(_) => "storage",
        }
    }
}

fn format_states(states: &[MediationState]) -> String {
    states
        .iter()
        .map(MediationState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for mediation operations
pub type MediationResult<T> = Result<T, MediationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = MediationError::InvalidState {
            record_id: "med-1".into(),
            current: MediationState::Denied,
            allowed: vec![MediationState::Requested],
        };
        assert_eq!(
            err.to_string(),
            "Mediation record med-1 is in invalid state denied. Valid states are: requested"
        );
        assert_eq!(err.kind(), "invalid-state");
    }
}
