//! Runtime errors

use dc_01_action_menu::ActionMenuError;
use dc_02_issue_credential::CredentialError;
use dc_03_mediation::MediationError;
use shared_types::{ConnectionError, MessageError};
use thiserror::Error;

use crate::container::config::ConfigError;
use crate::transport::TransportError;

/// Errors raised while routing an inbound message to its protocol handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("No handler registered for protocol {0}")]
    UnsupportedProtocol(String),

    #[error(transparent)]
    ActionMenu(#[from] ActionMenuError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Mediation(#[from] MediationError),
}

impl DispatchError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::UnsupportedProtocol(_) => "unsupported-protocol",
            Self::ActionMenu(err) => err.kind(),
            Self::Credential(err) => err.kind(),
            Self::Mediation(err) => err.kind(),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors surfaced by the agent and its module APIs.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Connection record {0} not found")]
    ConnectionNotFound(String),

    #[error("Record {0} is not bound to a connection")]
    RecordWithoutConnection(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    ActionMenu(#[from] ActionMenuError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Mediation(#[from] MediationError),
}

pub type AgentResult<T> = Result<T, AgentError>;
