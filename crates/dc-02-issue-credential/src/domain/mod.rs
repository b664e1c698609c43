//! Domain layer for the Issue Credential protocol

pub mod auto_accept;
pub mod preview;
pub mod record;
pub mod state;

pub use auto_accept::{compose_auto_accept, AutoAcceptCredential};
pub use preview::{are_preview_attributes_equal, CredentialPreview, CredentialPreviewAttribute};
pub use record::{
    CredentialExchangeRecord, METADATA_CREDENTIAL, METADATA_REQUEST, PROTOCOL_VERSION_V1,
};
pub use state::{CredentialRole, CredentialState};
