//! Error types for the Action Menu protocol

use std::fmt;

use shared_storage::StorageError;
use shared_types::{ConnectionError, MessageError};
use thiserror::Error;

use crate::domain::{ActionMenuRole, ActionMenuState};

/// Reason codes carried by action menu problem reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMenuProblemReportReason {
    /// The menu was cleared by the responder before the selection arrived.
    Timeout,
}

impl ActionMenuProblemReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ActionMenuProblemReportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action Menu errors
#[derive(Debug, Error)]
pub enum ActionMenuError {
    /// Menu or selection failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Two options share the same name
    #[error("Action Menu contains duplicated options")]
    DuplicateOptions,

    /// Selection is not one of the menu options
    #[error("Selection {name} does not match valid actions")]
    InvalidSelection { name: String },

    /// Record is in a state that does not allow the operation
    #[error(
        "Action Menu record {record_id} is in invalid state {current}. Valid states are: {}",
        format_states(.allowed)
    )]
    InvalidState {
        record_id: String,
        current: ActionMenuState,
        allowed: Vec<ActionMenuState>,
    },

    /// Record plays the other role
    #[error("Action Menu record {record_id} has invalid role {current}. Expected role {expected}")]
    InvalidRole {
        record_id: String,
        current: ActionMenuRole,
        expected: ActionMenuRole,
    },

    /// No record matches
    #[error("{0}")]
    NotFound(String),

    /// Condition the peer must be told about with a problem report
    #[error("{message} ({reason})")]
    ProblemReport {
        message: String,
        reason: ActionMenuProblemReportReason,
    },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ActionMenuError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::DuplicateOptions => "duplicate-options",
            Self::InvalidSelection { .. } => "invalid-selection",
            Self::InvalidState { .. } => "invalid-state",
            Self::InvalidRole { .. } => "invalid-role",
            Self::NotFound(_) => "not-found",
            Self::ProblemReport { .. } => "problem-report",
            Self::Connection(_) => "connection",
            Self::Message(_) => "message",
            Self::Storage(_) => "storage",
        }
    }
}

fn format_states(states: &[ActionMenuState]) -> String {
    states
        .iter()
        .map(ActionMenuState::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for action menu operations
pub type ActionMenuResult<T> = Result<T, ActionMenuError>;
