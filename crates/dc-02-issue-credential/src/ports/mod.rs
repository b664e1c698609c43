//! Ports for the credential service

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::{
    CredentialEventPublisher, CredentialFormatInput, CredentialFormatService, CredentialStore,
    FormatOutput,
};
