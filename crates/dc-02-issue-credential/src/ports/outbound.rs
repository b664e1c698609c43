//! Driven ports (SPI - Outbound)
//!
//! Besides storage and events the service needs a credential format: the
//! component that builds and checks the attachment payloads. The protocol
//! flow is the same for every format.

use async_trait::async_trait;
use shared_bus::EventPublisher;
use shared_storage::StorageService;
use shared_types::{AgentContext, Attachment};

use crate::domain::{CredentialExchangeRecord, CredentialPreviewAttribute};
use crate::error::CredentialResult;
use crate::events::CredentialEvent;

/// Record store used by the credential service.
pub trait CredentialStore: StorageService {}

impl<T: StorageService + ?Sized> CredentialStore for T {}

/// Event sink used by the credential service.
pub trait CredentialEventPublisher: EventPublisher<CredentialEvent> {}

impl<T: EventPublisher<CredentialEvent> + ?Sized> CredentialEventPublisher for T {}

/// What the issuer wants to offer.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialFormatInput {
    pub cred_def_id: String,
    pub schema_id: Option<String>,
    pub attributes: Vec<CredentialPreviewAttribute>,
}

/// Attachment built by a format, plus the preview it implies.
#[derive(Debug, Clone)]
pub struct FormatOutput {
    pub attachment: Attachment,
    pub preview_attributes: Vec<CredentialPreviewAttribute>,
}

/// Credential format handler.
///
/// Each `process_*` validates an inbound attachment and may record what it
/// learned on the record; each `accept_*`/`create_*` builds the next
/// attachment under `attach_id`.
#[async_trait]
pub trait CredentialFormatService: Send + Sync {
    /// Format identifier, for logs.
    fn format_key(&self) -> &'static str;

    async fn create_offer(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        input: &CredentialFormatInput,
        attach_id: &str,
    ) -> CredentialResult<FormatOutput>;

    async fn process_offer(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        offer: &Attachment,
    ) -> CredentialResult<()>;

    async fn accept_offer(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        offer: &Attachment,
        attach_id: &str,
    ) -> CredentialResult<Attachment>;

    async fn process_request(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        request: &Attachment,
    ) -> CredentialResult<()>;

    async fn accept_request(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        offer: &Attachment,
        request: &Attachment,
        attach_id: &str,
    ) -> CredentialResult<Attachment>;

    async fn process_credential(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        credential: &Attachment,
        request: &Attachment,
    ) -> CredentialResult<()>;

    async fn should_auto_respond_to_request(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        offer: &Attachment,
        request: &Attachment,
    ) -> bool;

    async fn should_auto_respond_to_credential(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        credential: &Attachment,
        request: &Attachment,
        offer: Option<&Attachment>,
    ) -> bool;
}
