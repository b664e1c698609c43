//! Issue Credential message handler
//!
//! Processes each inbound message and, when the auto-accept policy allows
//! it, answers with the next step of the flow:
//!
//! | Inbound | Auto reply | Destination |
//! |---------|------------|-------------|
//! | `propose-credential` | `offer-credential` | connection only |
//! | `offer-credential` | `request-credential` | connection or service |
//! | `request-credential` | `issue-credential` | connection or service |
//! | `issue-credential` | `ack` | connection or service |
//! | `ack`, `problem-report` | none | |

use std::sync::Arc;

use agent_telemetry::{log_rejected_message, metric_inc, OUTBOUND_DROPPED, PROBLEM_REPORTS_SENT};
use shared_types::{
    AgentMessage, InboundMessageContext, OutboundMessageContext, PlaintextMessage,
    ProblemReportDescription, ServiceDecorator,
};
use tracing::{debug, error};

use crate::error::{CredentialError, CredentialResult};
use crate::messages::{
    CredentialMessage, CredentialProblemReportMessage, IssueCredentialMessage,
    OfferCredentialMessage, ProposeCredentialMessage, RequestCredentialMessage, PROTOCOL_NAME,
};
use crate::ports::inbound::{
    AcceptCredentialOptions, AcceptOfferOptions, AcceptProposalOptions, AcceptRequestOptions,
    CredentialsApi,
};

type Reply = CredentialResult<Option<OutboundMessageContext>>;

/// Handler for every `https://didcomm.org/issue-credential/1.x/*` message.
pub struct CredentialHandler<A>
where
    A: CredentialsApi + ?Sized,
{
    service: Arc<A>,
    /// Our endpoint for connection-less replies.
    our_service: Option<ServiceDecorator>,
}

impl<A> CredentialHandler<A>
where
    A: CredentialsApi + ?Sized,
{
    pub fn new(service: Arc<A>) -> Self {
        Self {
            service,
            our_service: None,
        }
    }

    pub fn with_our_service(mut self, service: ServiceDecorator) -> Self {
        self.our_service = Some(service);
        self
    }

    /// Handle one inbound message, returning the reply to send, if any.
    pub async fn handle(&self, inbound: InboundMessageContext<PlaintextMessage>) -> Reply {
        let message = CredentialMessage::parse(&inbound.message)?;
        let name = message.name();
        debug!(message = name, id = %inbound.message.id(), "Handling issue credential message");

        let result = match message {
            CredentialMessage::Propose(proposal) => {
                let inbound = inbound.with_message(proposal);
                let reply = self.handle_proposal(&inbound).await;
                self.report_problems(&inbound, reply)
            }
            CredentialMessage::Offer(offer) => {
                let inbound = inbound.with_message(offer);
                let reply = self.handle_offer(&inbound).await;
                self.report_problems(&inbound, reply)
            }
            CredentialMessage::Request(request) => {
                let inbound = inbound.with_message(request);
                let reply = self.handle_request(&inbound).await;
                self.report_problems(&inbound, reply)
            }
            CredentialMessage::Issue(credential) => {
                let inbound = inbound.with_message(credential);
                let reply = self.handle_credential(&inbound).await;
                self.report_problems(&inbound, reply)
            }
            CredentialMessage::Ack(ack) => self
                .service
                .process_ack(&inbound.with_message(ack))
                .await
                .map(|_| None),
            CredentialMessage::ProblemReport(report) => self
                .service
                .process_problem_report(&inbound.with_message(report))
                .await
                .map(|_| None),
        };

        if let Err(err) = &result {
            log_rejected_message!(PROTOCOL_NAME, name, err, kind = err.kind());
        }
        result
    }

    async fn handle_proposal(
        &self,
        inbound: &InboundMessageContext<ProposeCredentialMessage>,
    ) -> Reply {
        let ctx = &inbound.agent_context;
        let record = self.service.process_proposal(inbound).await?;
        if !self
            .service
            .should_auto_respond_to_proposal(ctx, &record, &inbound.message)
            .await?
        {
            return Ok(None);
        }

        let record = self.service.get_by_id(ctx, &record.id).await?;
        let offer = self
            .service
            .accept_proposal(ctx, AcceptProposalOptions::new(record))
            .await?;
        self.reply(inbound, &offer.message, None, Some(&offer.record.id))
    }

    async fn handle_offer(&self, inbound: &InboundMessageContext<OfferCredentialMessage>) -> Reply {
        let ctx = &inbound.agent_context;
        let record = self.service.process_offer(inbound).await?;
        if !self
            .service
            .should_auto_respond_to_offer(ctx, &record, &inbound.message)
            .await?
        {
            return Ok(None);
        }

        let record = self.service.get_by_id(ctx, &record.id).await?;
        let request = self
            .service
            .accept_offer(ctx, AcceptOfferOptions::new(record))
            .await?;
        self.reply(
            inbound,
            &request.message,
            self.our_service.clone(),
            Some(&request.record.id),
        )
    }

    async fn handle_request(
        &self,
        inbound: &InboundMessageContext<RequestCredentialMessage>,
    ) -> Reply {
        let ctx = &inbound.agent_context;
        let record = self.service.process_request(inbound).await?;
        if !self
            .service
            .should_auto_respond_to_request(ctx, &record, &inbound.message)
            .await?
        {
            return Ok(None);
        }

        let record = self.service.get_by_id(ctx, &record.id).await?;
        let offer = self.service.find_offer_message(ctx, &record.id).await?;
        let credential = self
            .service
            .accept_request(ctx, AcceptRequestOptions::new(record))
            .await?;
        let our_service = offer
            .and_then(|offer| offer.service().cloned())
            .or_else(|| self.our_service.clone());
        self.reply(
            inbound,
            &credential.message,
            our_service,
            Some(&credential.record.id),
        )
    }

    async fn handle_credential(
        &self,
        inbound: &InboundMessageContext<IssueCredentialMessage>,
    ) -> Reply {
        let ctx = &inbound.agent_context;
        let record = self.service.process_credential(inbound).await?;
        if !self
            .service
            .should_auto_respond_to_credential(ctx, &record, &inbound.message)
            .await?
        {
            return Ok(None);
        }

        let record = self.service.get_by_id(ctx, &record.id).await?;
        let request = self.service.find_request_message(ctx, &record.id).await?;
        let ack = self
            .service
            .accept_credential(
                ctx,
                AcceptCredentialOptions {
                    credential_record: record,
                },
            )
            .await?;
        let our_service = request
            .and_then(|request| request.service().cloned())
            .or_else(|| self.our_service.clone());
        self.reply(inbound, &ack.message, our_service, Some(&ack.record.id))
    }

    /// Answer over the inbound connection, or to the inbound `~service` when
    /// there is none. Without either the reply is dropped.
    fn reply<M: AgentMessage, R: AgentMessage>(
        &self,
        inbound: &InboundMessageContext<M>,
        reply: &R,
        our_service: Option<ServiceDecorator>,
        record_id: Option<&str>,
    ) -> Reply {
        let record_id = record_id.map(str::to_string);

        if let Some(connection) = &inbound.connection {
            return Ok(Some(OutboundMessageContext::for_connection(
                reply,
                &inbound.agent_context,
                connection.clone(),
                record_id,
            )?));
        }

        if let (Some(their_service), Some(our_service)) = (inbound.message.service(), our_service) {
            return Ok(Some(OutboundMessageContext::for_service(
                reply,
                &inbound.agent_context,
                their_service.clone(),
                our_service,
                record_id,
            )?));
        }

        error!(
            protocol = PROTOCOL_NAME,
            message = R::TYPE.message_name,
            record_id = ?record_id,
            "Could not automatically create reply: no connection or service to send it to"
        );
        metric_inc!(OUTBOUND_DROPPED);
        Ok(None)
    }

    /// Turn a problem-report condition into an outbound problem report on
    /// the inbound thread.
    fn report_problems<M: AgentMessage>(
        &self,
        inbound: &InboundMessageContext<M>,
        result: Reply,
    ) -> Reply {
        match result {
            Err(CredentialError::ProblemReport { message, reason }) => {
                let report = CredentialProblemReportMessage::new(
                    ProblemReportDescription::new(message, reason.as_str()),
                    inbound.message.thread_id(),
                );
                let outbound = self.reply(inbound, &report, self.our_service.clone(), None)?;
                if outbound.is_some() {
                    metric_inc!(PROBLEM_REPORTS_SENT, &[PROTOCOL_NAME, reason.as_str()]);
                }
                Ok(outbound)
            }
            other => other,
        }
    }
}
