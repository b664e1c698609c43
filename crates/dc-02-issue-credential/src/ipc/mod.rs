//! Inbound message handling for the Issue Credential protocol

pub mod handler;

pub use handler::CredentialHandler;
