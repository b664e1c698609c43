//! # Error Types
//!
//! Errors shared by every protocol crate.

use thiserror::Error;

/// Errors raised while parsing, validating or (de)serializing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The `@type` string is not a valid message type URI.
    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),

    /// A required top-level field is missing.
    #[error("Message is missing required field {0}")]
    MissingField(&'static str),

    /// The message was routed to the wrong typed parser.
    #[error("Unexpected message type: expected {expected}, got {actual}")]
    UnexpectedMessageType { expected: String, actual: String },

    /// Input failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
}

/// Errors about the connection an exchange runs over.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Connection exists but has not completed DID exchange.
    #[error("Connection record {connection_id} is not ready to be used (state {state})")]
    NotReady {
        connection_id: String,
        state: String,
    },

    /// An inbound message arrived without a connection where one is required.
    #[error("No connection associated with incoming message {message_type}")]
    NoConnection { message_type: String },

    /// Neither a connection nor a usable service decorator is available.
    #[error("No connection or service decorator available for message {message_type}")]
    NoConnectionOrService { message_type: String },

    /// Inbound recipient key is not one we advertised for this exchange.
    #[error("Inbound message recipient key {key} was not in the service decorator we sent")]
    RecipientKeyMismatch { key: String },

    /// Inbound sender key is not the one the peer advertised for this exchange.
    #[error("Inbound message sender key {key} was not in the service decorator we received")]
    SenderKeyMismatch { key: String },

    /// Lookup failed.
    #[error("Connection record {0} not found")]
    NotFound(String),
}
