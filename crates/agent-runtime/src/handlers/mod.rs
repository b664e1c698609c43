//! # Protocol Handlers
//!
//! Each protocol crate ships a handler with its own result type. The
//! [`MessageHandler`] trait gives the dispatcher one shape to call.

use async_trait::async_trait;
use dc_01_action_menu::{ActionMenuApi, ActionMenuHandler};
use dc_02_issue_credential::{CredentialHandler, CredentialsApi};
use dc_03_mediation::{MediationApi, MediationHandler};
use shared_types::{InboundMessageContext, OutboundMessageContext, PlaintextMessage, Protocol};

use crate::error::DispatchResult;

/// A handler for every message of one protocol major version.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Protocol name as it appears in `@type`, e.g. `action-menu`.
    fn protocol_name(&self) -> &'static str;

    /// Supported `major.minor` version.
    fn protocol_version(&self) -> &'static str;

    /// Feature entry advertised for this protocol.
    fn feature(&self) -> Protocol;

    /// Process one inbound message, returning the reply to send, if any.
    async fn handle(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> DispatchResult<Option<OutboundMessageContext>>;
}

#[async_trait]
impl<A> MessageHandler for ActionMenuHandler<A>
where
    A: ActionMenuApi + ?Sized + 'static,
{
    fn protocol_name(&self) -> &'static str {
        dc_01_action_menu::PROTOCOL_NAME
    }

    fn protocol_version(&self) -> &'static str {
        dc_01_action_menu::PROTOCOL_VERSION
    }

    fn feature(&self) -> Protocol {
        dc_01_action_menu::protocol()
    }

    async fn handle(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> DispatchResult<Option<OutboundMessageContext>> {
        Ok(ActionMenuHandler::handle(self, inbound).await?)
    }
}

#[async_trait]
impl<A> MessageHandler for CredentialHandler<A>
where
    A: CredentialsApi + ?Sized + 'static,
{
    fn protocol_name(&self) -> &'static str {
        dc_02_issue_credential::PROTOCOL_NAME
    }

    fn protocol_version(&self) -> &'static str {
        dc_02_issue_credential::PROTOCOL_VERSION
    }

    fn feature(&self) -> Protocol {
        dc_02_issue_credential::protocol()
    }

    async fn handle(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> DispatchResult<Option<OutboundMessageContext>> {
        Ok(CredentialHandler::handle(self, inbound).await?)
    }
}

#[async_trait]
impl<A> MessageHandler for MediationHandler<A>
where
    A: MediationApi + ?Sized + 'static,
{
    fn protocol_name(&self) -> &'static str {
        dc_03_mediation::PROTOCOL_NAME
    }

    fn protocol_version(&self) -> &'static str {
        dc_03_mediation::PROTOCOL_VERSION
    }

    fn feature(&self) -> Protocol {
        dc_03_mediation::protocol()
    }

    async fn handle(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> DispatchResult<Option<OutboundMessageContext>> {
        Ok(MediationHandler::handle(self, inbound).await?)
    }
}
