//! Coordinate Mediation message handler
//!
//! | Inbound | Reply |
//! |---------|-------|
//! | `mediate-request` | `mediate-grant` when auto-accept is on |
//! | `keylist-update` | `keylist-update-response` |
//! | `mediate-grant`, `mediate-deny`, `keylist-update-response` | none |
//!
//! Mediation always runs over a connection, so every reply goes back over
//! the inbound connection.

use std::sync::Arc;

use agent_telemetry::log_rejected_message;
use shared_types::{AgentMessage, InboundMessageContext, OutboundMessageContext, PlaintextMessage};
use tracing::debug;

use crate::error::MediationResult;
use crate::messages::{MediationMessage, MediationRequestMessage, PROTOCOL_NAME};
use crate::ports::inbound::MediationApi;

/// Handler for every `https://didcomm.org/coordinate-mediation/1.x/*` message.
pub struct MediationHandler<A>
where
    A: MediationApi + ?Sized,
{
    service: Arc<A>,
    auto_accept_mediation_requests: bool,
}

impl<A> MediationHandler<A>
where
    A: MediationApi + ?Sized,
{
    pub fn new(service: Arc<A>) -> Self {
        Self {
            service,
            auto_accept_mediation_requests: false,
        }
    }

    /// Grant every mediation request as soon as it arrives.
    pub fn with_auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept_mediation_requests = auto_accept;
        self
    }

    /// Handle one inbound message, returning the reply to send, if any.
    pub async fn handle(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> MediationResult<Option<OutboundMessageContext>> {
        let message = MediationMessage::parse(&inbound.message)?;
        let name = message.name();
        debug!(message = name, id = %inbound.message.id(), "Handling mediation message");

        let result = match message {
            MediationMessage::Request(request) => {
                self.handle_request(&inbound.with_message(request)).await
            }
            MediationMessage::Grant(grant) => self
                .service
                .process_mediation_grant(&inbound.with_message(grant))
                .await
                .map(|_| None),
            MediationMessage::Deny(deny) => self
                .service
                .process_mediation_deny(&inbound.with_message(deny))
                .await
                .map(|_| None),
            MediationMessage::KeylistUpdate(update) => {
                let inbound = inbound.with_message(update);
                match self.service.process_keylist_update_request(&inbound).await {
                    Ok(response) => reply(&inbound, &response).map(Some),
                    Err(err) => Err(err),
                }
            }
            MediationMessage::KeylistUpdateResponse(response) => self
                .service
                .process_keylist_update_results(&inbound.with_message(response))
                .await
                .map(|_| None),
        };

        if let Err(err) = &result {
            log_rejected_message!(PROTOCOL_NAME, name, err, kind = err.kind());
        }
        result
    }

    async fn handle_request(
        &self,
        inbound: &InboundMessageContext<MediationRequestMessage>,
    ) -> MediationResult<Option<OutboundMessageContext>> {
        let record = self.service.process_mediation_request(inbound).await?;
        if !self.auto_accept_mediation_requests {
            return Ok(None);
        }

        let grant = self
            .service
            .create_grant_mediation_message(&inbound.agent_context, record)
            .await?;
        reply(inbound, &grant.message).map(Some)
    }
}

fn reply<M: AgentMessage, R: AgentMessage>(
    inbound: &InboundMessageContext<M>,
    message: &R,
) -> MediationResult<OutboundMessageContext> {
    let connection = inbound.assert_ready_connection()?.clone();
    Ok(OutboundMessageContext::for_connection(
        message,
        &inbound.agent_context,
        connection,
        None,
    )?)
}
