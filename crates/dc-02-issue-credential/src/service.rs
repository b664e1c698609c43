//! Credential Service - issue credential v1 state machine
//!
//! Every message sent or received is stored next to the record so later
//! steps can read it back: the issuer needs its own offer when it answers a
//! request, the holder needs its request when the credential arrives.
//!
//! Inbound messages are correlated by `(thread, role, connection)`. For
//! connection-less exchanges the `~service` decorators of the previous
//! messages in the thread bind the keys the peer may use.

use std::sync::Arc;

use agent_telemetry::{log_exchange_event, metric_inc, STATE_TRANSITIONS};
use async_trait::async_trait;
use shared_storage::{DidCommMessageRepository, DidCommMessageRole, Query, QueryOptions, Repository};
use shared_types::{
    generate_id, AgentContext, AgentMessage, Attachment, InboundMessageContext,
    ProblemReportDescription, ServiceDecorator,
};
use tracing::{debug, info};

use crate::domain::{
    are_preview_attributes_equal, compose_auto_accept, AutoAcceptCredential,
    CredentialExchangeRecord, CredentialPreview, CredentialRole, CredentialState,
    PROTOCOL_VERSION_V1,
};
use crate::error::{CredentialError, CredentialProblemReportReason, CredentialResult};
use crate::events::CredentialEvent;
use crate::messages::{
    AckStatus, CredentialAckMessage, CredentialProblemReportMessage, IssueCredentialMessage,
    OfferCredentialMessage, ProposeCredentialMessage, RequestCredentialMessage,
    INDY_CREDENTIAL_ATTACHMENT_ID, INDY_CREDENTIAL_OFFER_ATTACHMENT_ID,
    INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID, PROTOCOL_NAME,
};
use crate::ports::inbound::{
    AcceptCredentialOptions, AcceptOfferOptions, AcceptProposalOptions, AcceptRequestOptions,
    CreateOfferOptions, CreateProblemReportOptions, CreateProposalOptions, CredentialsApi,
    DeleteCredentialOptions, MessageAndRecord, NegotiateOfferOptions, NegotiateProposalOptions,
};
use crate::ports::outbound::{
    CredentialEventPublisher, CredentialFormatInput, CredentialFormatService, CredentialStore,
};

fn required<'a>(
    attachment: Option<&'a Attachment>,
    attachment_id: &'static str,
    message_type: &'static str,
) -> CredentialResult<&'a Attachment> {
    attachment.ok_or(CredentialError::MissingAttachment {
        attachment_id,
        message_type,
    })
}

/// Issue credential v1 service.
pub struct CredentialService<S, P>
where
    S: CredentialStore + ?Sized,
    P: CredentialEventPublisher + ?Sized,
{
    repository: Repository<CredentialExchangeRecord, S>,
    messages: DidCommMessageRepository<S>,
    format: Arc<dyn CredentialFormatService>,
    events: Arc<P>,
    auto_accept: AutoAcceptCredential,
}

impl<S, P> CredentialService<S, P>
where
    S: CredentialStore + ?Sized,
    P: CredentialEventPublisher + ?Sized,
{
    pub fn new(storage: Arc<S>, events: Arc<P>, format: Arc<dyn CredentialFormatService>) -> Self {
        Self {
            repository: Repository::new(Arc::clone(&storage)),
            messages: DidCommMessageRepository::new(storage),
            format,
            events,
            auto_accept: AutoAcceptCredential::default(),
        }
    }

    /// Agent-wide auto accept policy, used when a record has no override.
    pub fn with_auto_accept(mut self, auto_accept: AutoAcceptCredential) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    fn auto_accept_for(&self, record: &CredentialExchangeRecord) -> AutoAcceptCredential {
        compose_auto_accept(record.auto_accept_credential, Some(self.auto_accept))
    }

    async fn save_new<M: AgentMessage>(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        message: &M,
        role: DidCommMessageRole,
    ) -> CredentialResult<()> {
        self.repository.save(ctx, record).await?;
        self.messages
            .save_agent_message(ctx, message, role, &record.id)
            .await?;
        info!(
            record_id = %record.id,
            thread_id = %record.thread_id,
            role = record.role.as_str(),
            format = self.format.format_key(),
            "Credential exchange created"
        );
        self.emit_state_changed(ctx, record, None).await;
        Ok(())
    }

    async fn emit_state_changed(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        previous_state: Option<CredentialState>,
    ) {
        log_exchange_event!(
            debug,
            PROTOCOL_NAME,
            record.id,
            record.thread_id,
            previous_state,
            record.state
        );
        metric_inc!(STATE_TRANSITIONS, &[PROTOCOL_NAME, record.state.as_str()]);
        self.events
            .publish(CredentialEvent::state_changed(ctx, record, previous_state))
            .await;
    }

    /// `~service` of the last message we received of type `R` and the last
    /// we sent of type `T`.
    async fn previous_services<R: AgentMessage, T: AgentMessage>(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<(Option<ServiceDecorator>, Option<ServiceDecorator>)> {
        let received = self
            .messages
            .find_agent_message::<R>(ctx, record_id, Some(DidCommMessageRole::Receiver))
            .await?;
        let sent = self
            .messages
            .find_agent_message::<T>(ctx, record_id, Some(DidCommMessageRole::Sender))
            .await?;
        Ok((
            received.and_then(|m| m.service().cloned()),
            sent.and_then(|m| m.service().cloned()),
        ))
    }

    async fn assert_previous_services<M, R, T>(
        &self,
        inbound: &InboundMessageContext<M>,
        record_id: &str,
    ) -> CredentialResult<()>
    where
        M: AgentMessage,
        R: AgentMessage,
        T: AgentMessage,
    {
        let (received, sent) = self
            .previous_services::<R, T>(&inbound.agent_context, record_id)
            .await?;
        inbound.assert_connection_or_service(received.as_ref(), sent.as_ref())?;
        Ok(())
    }

    async fn inbound_record<M: AgentMessage>(
        &self,
        inbound: &InboundMessageContext<M>,
        role: CredentialRole,
    ) -> CredentialResult<Option<CredentialExchangeRecord>> {
        self.find_by_thread_and_connection_id(
            &inbound.agent_context,
            inbound.message.thread_id(),
            inbound.connection.as_ref().map(|c| c.id.as_str()),
            Some(role),
        )
        .await
    }

    async fn expect_inbound_record<M: AgentMessage>(
        &self,
        inbound: &InboundMessageContext<M>,
        role: CredentialRole,
    ) -> CredentialResult<CredentialExchangeRecord> {
        self.inbound_record(inbound, role).await?.ok_or_else(|| {
            CredentialError::NotFound(format!(
                "No credential record found for thread id {}",
                inbound.message.thread_id()
            ))
        })
    }

    /// Offer on an existing issuer record (answer to a proposal).
    async fn offer_on_record(
        &self,
        ctx: &AgentContext,
        mut record: CredentialExchangeRecord,
        input: CredentialFormatInput,
        comment: Option<String>,
        auto_accept: Option<AutoAcceptCredential>,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>> {
        let output = self
            .format
            .create_offer(ctx, &mut record, &input, INDY_CREDENTIAL_OFFER_ATTACHMENT_ID)
            .await?;

        let mut message = OfferCredentialMessage::new(
            CredentialPreview::new(output.preview_attributes.clone()),
            output.attachment,
        );
        message.set_thread(record.thread_id.clone(), record.parent_thread_id.clone());
        message.comment = comment;

        record.credential_attributes = Some(output.preview_attributes);
        record.auto_accept_credential = auto_accept.or(record.auto_accept_credential);

        self.messages
            .save_or_update_agent_message(ctx, &message, DidCommMessageRole::Sender, &record.id)
            .await?;
        self.update_state(ctx, &mut record, CredentialState::OfferSent)
            .await?;
        Ok(MessageAndRecord { message, record })
    }
}

#[async_trait]
impl<S, P> CredentialsApi for CredentialService<S, P>
where
    S: CredentialStore + ?Sized,
    P: CredentialEventPublisher + ?Sized,
{
    async fn create_proposal(
        &self,
        ctx: &AgentContext,
        options: CreateProposalOptions,
    ) -> CredentialResult<MessageAndRecord<ProposeCredentialMessage>> {
        let CreateProposalOptions {
            connection,
            credential_proposal,
            cred_def_id,
            schema_id,
            schema_issuer_did,
            schema_name,
            schema_version,
            issuer_did,
            linked_attachments,
            comment,
            auto_accept_credential,
        } = options;
        connection.assert_ready()?;

        let mut message = ProposeCredentialMessage::new(credential_proposal);
        message.comment = comment;
        message.cred_def_id = cred_def_id;
        message.schema_id = schema_id;
        message.schema_issuer_did = schema_issuer_did;
        message.schema_name = schema_name;
        message.schema_version = schema_version;
        message.issuer_did = issuer_did;
        message.header.attachments = linked_attachments.clone();

        let mut record = CredentialExchangeRecord::new(
            CredentialRole::Holder,
            CredentialState::ProposalSent,
            message.thread_id(),
            Some(connection.id.clone()),
        );
        record.credential_attributes = message
            .credential_proposal
            .as_ref()
            .map(|preview| preview.attributes.clone());
        record.linked_attachments = (!linked_attachments.is_empty()).then_some(linked_attachments);
        record.auto_accept_credential = auto_accept_credential;

        self.save_new(ctx, &record, &message, DidCommMessageRole::Sender)
            .await?;
        Ok(MessageAndRecord { message, record })
    }

    async fn process_proposal(
        &self,
        inbound: &InboundMessageContext<ProposeCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        let ctx = &inbound.agent_context;
        let message = &inbound.message;
        debug!(message_id = %message.id(), "Processing credential proposal");

        let attributes = message
            .credential_proposal
            .as_ref()
            .map(|preview| preview.attributes.clone());

        match self.inbound_record(inbound, CredentialRole::Issuer).await? {
            Some(mut record) => {
                record.assert_state(&[CredentialState::OfferSent])?;
                self.assert_previous_services::<_, ProposeCredentialMessage, OfferCredentialMessage>(
                    inbound, &record.id,
                )
                .await?;

                record.credential_attributes = attributes;
                self.messages
                    .save_or_update_agent_message(
                        ctx,
                        message,
                        DidCommMessageRole::Receiver,
                        &record.id,
                    )
                    .await?;
                self.update_state(ctx, &mut record, CredentialState::ProposalReceived)
                    .await?;
                Ok(record)
            }
            None => {
                let connection = inbound.assert_ready_connection()?;
                let mut record = CredentialExchangeRecord::new(
                    CredentialRole::Issuer,
                    CredentialState::ProposalReceived,
                    message.thread_id(),
                    Some(connection.id.clone()),
                );
                record.parent_thread_id = message.parent_thread_id().map(str::to_string);
                record.credential_attributes = attributes;

                self.save_new(ctx, &record, message, DidCommMessageRole::Receiver)
                    .await?;
                Ok(record)
            }
        }
    }

    async fn accept_proposal(
        &self,
        ctx: &AgentContext,
        options: AcceptProposalOptions,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>> {
        let AcceptProposalOptions {
            credential_record: record,
            cred_def_id,
            attributes,
            comment,
            auto_accept_credential,
        } = options;
        record.assert_state(&[CredentialState::ProposalReceived])?;
        record.assert_protocol_version(PROTOCOL_VERSION_V1)?;

        let proposal: ProposeCredentialMessage = self
            .messages
            .get_agent_message(ctx, &record.id, Some(DidCommMessageRole::Receiver))
            .await?;

        let cred_def_id = cred_def_id.or(proposal.cred_def_id).ok_or_else(|| {
            CredentialError::Validation(
                "Missing required credential definition id. If the credential proposal has no \
                 credential definition id it must be passed to accept_proposal"
                    .into(),
            )
        })?;
        let attributes = attributes
            .or(proposal.credential_proposal.map(|preview| preview.attributes))
            .ok_or_else(|| {
                CredentialError::Validation(
                    "Missing required credential preview from proposal message".into(),
                )
            })?;

        let input = CredentialFormatInput {
            cred_def_id,
            schema_id: proposal.schema_id,
            attributes,
        };
        self.offer_on_record(ctx, record, input, comment, auto_accept_credential)
            .await
    }

    async fn negotiate_proposal(
        &self,
        ctx: &AgentContext,
        options: NegotiateProposalOptions,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>> {
        let NegotiateProposalOptions {
            credential_record: record,
            offer,
            comment,
            auto_accept_credential,
        } = options;
        record.assert_state(&[CredentialState::ProposalReceived])?;
        record.assert_protocol_version(PROTOCOL_VERSION_V1)?;

        self.offer_on_record(ctx, record, offer, comment, auto_accept_credential)
            .await
    }

    async fn create_offer(
        &self,
        ctx: &AgentContext,
        options: CreateOfferOptions,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>> {
        let CreateOfferOptions {
            connection,
            offer,
            comment,
            auto_accept_credential,
        } = options;
        if let Some(connection) = &connection {
            connection.assert_ready()?;
        }

        let mut record = CredentialExchangeRecord::new(
            CredentialRole::Issuer,
            CredentialState::OfferSent,
            generate_id(),
            connection.map(|c| c.id),
        );
        let output = self
            .format
            .create_offer(ctx, &mut record, &offer, INDY_CREDENTIAL_OFFER_ATTACHMENT_ID)
            .await?;

        let mut message = OfferCredentialMessage::new(
            CredentialPreview::new(output.preview_attributes.clone()),
            output.attachment,
        );
        message.comment = comment;

        record.thread_id = message.thread_id().to_string();
        record.credential_attributes = Some(output.preview_attributes);
        record.auto_accept_credential = auto_accept_credential;

        self.save_new(ctx, &record, &message, DidCommMessageRole::Sender)
            .await?;
        Ok(MessageAndRecord { message, record })
    }

    async fn process_offer(
        &self,
        inbound: &InboundMessageContext<OfferCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        let ctx = &inbound.agent_context;
        let message = &inbound.message;
        debug!(message_id = %message.id(), "Processing credential offer");

        let offer = required(
            message.offer_attachment(),
            INDY_CREDENTIAL_OFFER_ATTACHMENT_ID,
            OfferCredentialMessage::TYPE.message_name,
        )?;
        let attributes = message.credential_preview.attributes.clone();

        match self.inbound_record(inbound, CredentialRole::Holder).await? {
            Some(mut record) => {
                record.assert_state(&[CredentialState::ProposalSent])?;
                self.assert_previous_services::<_, OfferCredentialMessage, ProposeCredentialMessage>(
                    inbound, &record.id,
                )
                .await?;

                self.format.process_offer(ctx, &mut record, offer).await?;
                record.credential_attributes = Some(attributes);
                self.messages
                    .save_or_update_agent_message(
                        ctx,
                        message,
                        DidCommMessageRole::Receiver,
                        &record.id,
                    )
                    .await?;
                self.update_state(ctx, &mut record, CredentialState::OfferReceived)
                    .await?;
                Ok(record)
            }
            None => {
                inbound.assert_connection_or_service(None, None)?;
                let mut record = CredentialExchangeRecord::new(
                    CredentialRole::Holder,
                    CredentialState::OfferReceived,
                    message.thread_id(),
                    inbound.connection.as_ref().map(|c| c.id.clone()),
                );
                record.parent_thread_id = message.parent_thread_id().map(str::to_string);
                record.credential_attributes = Some(attributes);
                self.format.process_offer(ctx, &mut record, offer).await?;

                self.save_new(ctx, &record, message, DidCommMessageRole::Receiver)
                    .await?;
                Ok(record)
            }
        }
    }

    async fn accept_offer(
        &self,
        ctx: &AgentContext,
        options: AcceptOfferOptions,
    ) -> CredentialResult<MessageAndRecord<RequestCredentialMessage>> {
        let AcceptOfferOptions {
            credential_record: mut record,
            comment,
            auto_accept_credential,
        } = options;
        record.assert_state(&[CredentialState::OfferReceived])?;
        record.assert_protocol_version(PROTOCOL_VERSION_V1)?;

        let offer_message: OfferCredentialMessage = self
            .messages
            .get_agent_message(ctx, &record.id, Some(DidCommMessageRole::Receiver))
            .await?;
        let offer = required(
            offer_message.offer_attachment(),
            INDY_CREDENTIAL_OFFER_ATTACHMENT_ID,
            OfferCredentialMessage::TYPE.message_name,
        )?;

        let request = self
            .format
            .accept_offer(ctx, &mut record, offer, INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID)
            .await?;
        let mut message = RequestCredentialMessage::new(request);
        message.set_thread(record.thread_id.clone(), record.parent_thread_id.clone());
        message.comment = comment;

        record.auto_accept_credential = auto_accept_credential.or(record.auto_accept_credential);

        self.messages
            .save_agent_message(ctx, &message, DidCommMessageRole::Sender, &record.id)
            .await?;
        self.update_state(ctx, &mut record, CredentialState::RequestSent)
            .await?;
        Ok(MessageAndRecord { message, record })
    }

    async fn negotiate_offer(
        &self,
        ctx: &AgentContext,
        options: NegotiateOfferOptions,
    ) -> CredentialResult<MessageAndRecord<ProposeCredentialMessage>> {
        let NegotiateOfferOptions {
            credential_record: mut record,
            credential_proposal,
            cred_def_id,
            comment,
            auto_accept_credential,
        } = options;
        record.assert_state(&[CredentialState::OfferReceived])?;
        record.assert_protocol_version(PROTOCOL_VERSION_V1)?;

        if record.connection_id.is_none() {
            return Err(CredentialError::Validation(format!(
                "No connectionId found for credential record '{}'. Connection-less issuance \
                 does not support negotiation.",
                record.id
            )));
        }

        record.credential_attributes = Some(credential_proposal.attributes.clone());
        record.auto_accept_credential = auto_accept_credential.or(record.auto_accept_credential);

        let mut message = ProposeCredentialMessage::new(Some(credential_proposal));
        message.cred_def_id = cred_def_id;
        message.comment = comment;
        message.set_thread(record.thread_id.clone(), record.parent_thread_id.clone());

        self.messages
            .save_or_update_agent_message(ctx, &message, DidCommMessageRole::Sender, &record.id)
            .await?;
        self.update_state(ctx, &mut record, CredentialState::ProposalSent)
            .await?;
        Ok(MessageAndRecord { message, record })
    }

    async fn decline_offer(
        &self,
        ctx: &AgentContext,
        mut credential_record: CredentialExchangeRecord,
    ) -> CredentialResult<CredentialExchangeRecord> {
        credential_record.assert_state(&[CredentialState::OfferReceived])?;
        self.update_state(ctx, &mut credential_record, CredentialState::Declined)
            .await?;
        Ok(credential_record)
    }

    async fn create_request(
        &self,
        _ctx: &AgentContext,
    ) -> CredentialResult<MessageAndRecord<RequestCredentialMessage>> {
        Err(CredentialError::Unsupported(
            "Starting from a request is not supported for v1 issue credential protocol".into(),
        ))
    }

    async fn process_request(
        &self,
        inbound: &InboundMessageContext<RequestCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        let ctx = &inbound.agent_context;
        let message = &inbound.message;
        debug!(message_id = %message.id(), "Processing credential request");

        let mut record = self
            .expect_inbound_record(inbound, CredentialRole::Issuer)
            .await?;
        record.assert_state(&[CredentialState::OfferSent])?;
        self.assert_previous_services::<_, ProposeCredentialMessage, OfferCredentialMessage>(
            inbound, &record.id,
        )
        .await?;

        let request = required(
            message.request_attachment(),
            INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID,
            RequestCredentialMessage::TYPE.message_name,
        )?;
        self.format.process_request(ctx, &mut record, request).await?;

        self.messages
            .save_agent_message(ctx, message, DidCommMessageRole::Receiver, &record.id)
            .await?;
        self.update_state(ctx, &mut record, CredentialState::RequestReceived)
            .await?;
        Ok(record)
    }

    async fn accept_request(
        &self,
        ctx: &AgentContext,
        options: AcceptRequestOptions,
    ) -> CredentialResult<MessageAndRecord<IssueCredentialMessage>> {
        let AcceptRequestOptions {
            credential_record: mut record,
            comment,
            auto_accept_credential,
        } = options;
        record.assert_state(&[CredentialState::RequestReceived])?;
        record.assert_protocol_version(PROTOCOL_VERSION_V1)?;

        let offer_message: OfferCredentialMessage = self
            .messages
            .get_agent_message(ctx, &record.id, Some(DidCommMessageRole::Sender))
            .await?;
        let request_message: RequestCredentialMessage = self
            .messages
            .get_agent_message(ctx, &record.id, Some(DidCommMessageRole::Receiver))
            .await?;
        let offer = required(
            offer_message.offer_attachment(),
            INDY_CREDENTIAL_OFFER_ATTACHMENT_ID,
            OfferCredentialMessage::TYPE.message_name,
        )?;
        let request = required(
            request_message.request_attachment(),
            INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID,
            RequestCredentialMessage::TYPE.message_name,
        )?;

        let credential = self
            .format
            .accept_request(ctx, &mut record, offer, request, INDY_CREDENTIAL_ATTACHMENT_ID)
            .await?;
        let mut message = IssueCredentialMessage::new(credential);
        message.set_thread(record.thread_id.clone(), record.parent_thread_id.clone());
        message.comment = comment;
        message.set_please_ack();

        record.auto_accept_credential = auto_accept_credential.or(record.auto_accept_credential);

        self.messages
            .save_agent_message(ctx, &message, DidCommMessageRole::Sender, &record.id)
            .await?;
        self.update_state(ctx, &mut record, CredentialState::CredentialIssued)
            .await?;
        Ok(MessageAndRecord { message, record })
    }

    async fn process_credential(
        &self,
        inbound: &InboundMessageContext<IssueCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        let ctx = &inbound.agent_context;
        let message = &inbound.message;
        debug!(message_id = %message.id(), "Processing issued credential");

        let mut record = self
            .expect_inbound_record(inbound, CredentialRole::Holder)
            .await?;
        record.assert_state(&[CredentialState::RequestSent])?;
        self.assert_previous_services::<_, OfferCredentialMessage, RequestCredentialMessage>(
            inbound, &record.id,
        )
        .await?;

        let request_message: RequestCredentialMessage = self
            .messages
            .get_agent_message(ctx, &record.id, Some(DidCommMessageRole::Sender))
            .await?;
        let credential = required(
            message.credential_attachment(),
            INDY_CREDENTIAL_ATTACHMENT_ID,
            IssueCredentialMessage::TYPE.message_name,
        )?;
        let request = required(
            request_message.request_attachment(),
            INDY_CREDENTIAL_REQUEST_ATTACHMENT_ID,
            RequestCredentialMessage::TYPE.message_name,
        )?;
        self.format
            .process_credential(ctx, &mut record, credential, request)
            .await?;

        self.messages
            .save_agent_message(ctx, message, DidCommMessageRole::Receiver, &record.id)
            .await?;
        self.update_state(ctx, &mut record, CredentialState::CredentialReceived)
            .await?;
        Ok(record)
    }

    async fn accept_credential(
        &self,
        ctx: &AgentContext,
        options: AcceptCredentialOptions,
    ) -> CredentialResult<MessageAndRecord<CredentialAckMessage>> {
        let mut record = options.credential_record;
        record.assert_state(&[CredentialState::CredentialReceived])?;
        record.assert_protocol_version(PROTOCOL_VERSION_V1)?;

        let mut message = CredentialAckMessage::new(AckStatus::Ok, &record.thread_id);
        message.set_thread(record.thread_id.clone(), record.parent_thread_id.clone());

        self.update_state(ctx, &mut record, CredentialState::Done)
            .await?;
        Ok(MessageAndRecord { message, record })
    }

    async fn process_ack(
        &self,
        inbound: &InboundMessageContext<CredentialAckMessage>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        debug!(message_id = %inbound.message.id(), "Processing credential ack");

        let mut record = self
            .expect_inbound_record(inbound, CredentialRole::Issuer)
            .await?;
        record.assert_state(&[CredentialState::CredentialIssued])?;
        self.assert_previous_services::<_, RequestCredentialMessage, IssueCredentialMessage>(
            inbound, &record.id,
        )
        .await?;

        self.update_state(&inbound.agent_context, &mut record, CredentialState::Done)
            .await?;
        Ok(record)
    }

    async fn create_problem_report(
        &self,
        _ctx: &AgentContext,
        options: CreateProblemReportOptions,
    ) -> CredentialResult<CredentialProblemReportMessage> {
        let record = options.credential_record;
        let mut message = CredentialProblemReportMessage::new(
            ProblemReportDescription::new(
                options.description,
                CredentialProblemReportReason::IssuanceAbandoned.as_str(),
            ),
            &record.thread_id,
        );
        message.set_thread(record.thread_id.clone(), record.parent_thread_id.clone());
        Ok(message)
    }

    async fn process_problem_report(
        &self,
        inbound: &InboundMessageContext<CredentialProblemReportMessage>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        let message = &inbound.message;
        debug!(message_id = %message.id(), "Processing credential problem report");

        let mut record = self
            .get_by_thread_and_connection_id(
                &inbound.agent_context,
                message.thread_id(),
                inbound.connection.as_ref().map(|c| c.id.as_str()),
                None,
            )
            .await?;
        record.error_message = Some(message.body.description.to_error_message());
        self.update(&inbound.agent_context, &mut record).await?;
        Ok(record)
    }

    async fn should_auto_respond_to_proposal(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        proposal: &ProposeCredentialMessage,
    ) -> CredentialResult<bool> {
        match self.auto_accept_for(record) {
            AutoAcceptCredential::Always => Ok(true),
            AutoAcceptCredential::Never => Ok(false),
            AutoAcceptCredential::ContentApproved => {
                // Only an answer to our own offer can be approved by content.
                let Some(offer) = self.find_offer_message(ctx, &record.id).await? else {
                    return Ok(false);
                };
                let same_preview = proposal.credential_proposal.as_ref().is_some_and(|preview| {
                    are_preview_attributes_equal(
                        &preview.attributes,
                        &offer.credential_preview.attributes,
                    )
                });
                Ok(same_preview
                    && proposal.cred_def_id.is_some()
                    && proposal.cred_def_id == offer.cred_def_id())
            }
        }
    }

    async fn should_auto_respond_to_offer(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        offer: &OfferCredentialMessage,
    ) -> CredentialResult<bool> {
        match self.auto_accept_for(record) {
            AutoAcceptCredential::Always => Ok(true),
            AutoAcceptCredential::Never => Ok(false),
            AutoAcceptCredential::ContentApproved => {
                let Some(proposal) = self.find_proposal_message(ctx, &record.id).await? else {
                    return Ok(false);
                };
                let same_preview = proposal.credential_proposal.as_ref().is_some_and(|preview| {
                    are_preview_attributes_equal(
                        &preview.attributes,
                        &offer.credential_preview.attributes,
                    )
                });
                Ok(same_preview
                    && proposal.cred_def_id.is_some()
                    && proposal.cred_def_id == offer.cred_def_id())
            }
        }
    }

    async fn should_auto_respond_to_request(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        request: &RequestCredentialMessage,
    ) -> CredentialResult<bool> {
        match self.auto_accept_for(record) {
            AutoAcceptCredential::Always => Ok(true),
            AutoAcceptCredential::Never => Ok(false),
            AutoAcceptCredential::ContentApproved => {
                let Some(offer) = self.find_offer_message(ctx, &record.id).await? else {
                    return Ok(false);
                };
                let (Some(offer), Some(request)) =
                    (offer.offer_attachment(), request.request_attachment())
                else {
                    return Ok(false);
                };
                Ok(self
                    .format
                    .should_auto_respond_to_request(ctx, record, offer, request)
                    .await)
            }
        }
    }

    async fn should_auto_respond_to_credential(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        credential: &IssueCredentialMessage,
    ) -> CredentialResult<bool> {
        match self.auto_accept_for(record) {
            AutoAcceptCredential::Always => Ok(true),
            AutoAcceptCredential::Never => Ok(false),
            AutoAcceptCredential::ContentApproved => {
                let Some(request) = self.find_request_message(ctx, &record.id).await? else {
                    return Ok(false);
                };
                let offer = self.find_offer_message(ctx, &record.id).await?;
                let (Some(credential), Some(request)) =
                    (credential.credential_attachment(), request.request_attachment())
                else {
                    return Ok(false);
                };
                Ok(self
                    .format
                    .should_auto_respond_to_credential(
                        ctx,
                        record,
                        credential,
                        request,
                        offer.as_ref().and_then(|o| o.offer_attachment()),
                    )
                    .await)
            }
        }
    }

    async fn find_proposal_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<ProposeCredentialMessage>> {
        Ok(self.messages.find_agent_message::<ProposeCredentialMessage>(ctx, record_id, None).await?)
    }

    async fn find_offer_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<OfferCredentialMessage>> {
        Ok(self.messages.find_agent_message::<OfferCredentialMessage>(ctx, record_id, None).await?)
    }

    async fn find_request_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<RequestCredentialMessage>> {
        Ok(self.messages.find_agent_message::<RequestCredentialMessage>(ctx, record_id, None).await?)
    }

    async fn find_credential_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<IssueCredentialMessage>> {
        Ok(self.messages.find_agent_message::<IssueCredentialMessage>(ctx, record_id, None).await?)
    }

    async fn get_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<CredentialExchangeRecord> {
        Ok(self.repository.get_by_id(ctx, record_id).await?)
    }

    async fn find_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<CredentialExchangeRecord>> {
        Ok(self.repository.find_by_id(ctx, record_id).await?)
    }

    async fn get_all(&self, ctx: &AgentContext) -> CredentialResult<Vec<CredentialExchangeRecord>> {
        Ok(self.repository.get_all(ctx).await?)
    }

    async fn find_all_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> CredentialResult<Vec<CredentialExchangeRecord>> {
        Ok(self.repository.find_by_query(ctx, query, options).await?)
    }

    async fn get_by_thread_and_connection_id(
        &self,
        ctx: &AgentContext,
        thread_id: &str,
        connection_id: Option<&str>,
        role: Option<CredentialRole>,
    ) -> CredentialResult<CredentialExchangeRecord> {
        self.find_by_thread_and_connection_id(ctx, thread_id, connection_id, role)
            .await?
            .ok_or_else(|| {
                CredentialError::NotFound(format!(
                    "No credential record found for thread id {thread_id}"
                ))
            })
    }

    async fn find_by_thread_and_connection_id(
        &self,
        ctx: &AgentContext,
        thread_id: &str,
        connection_id: Option<&str>,
        role: Option<CredentialRole>,
    ) -> CredentialResult<Option<CredentialExchangeRecord>> {
        let query = Query::and(vec![
            Query::eq("threadId", thread_id),
            Query::eq_opt("connectionId", connection_id),
            Query::eq_opt("role", role.map(|r| r.as_str())),
        ]);
        Ok(self.repository.find_single_by_query(ctx, &query).await?)
    }

    async fn update_state(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        new_state: CredentialState,
    ) -> CredentialResult<()> {
        let previous_state = record.state;
        record.state = new_state;
        self.repository.update(ctx, record).await?;
        self.emit_state_changed(ctx, record, Some(previous_state))
            .await;
        Ok(())
    }

    async fn update(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
    ) -> CredentialResult<()> {
        Ok(self.repository.update(ctx, record).await?)
    }

    async fn delete(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        options: DeleteCredentialOptions,
    ) -> CredentialResult<()> {
        self.repository.delete(ctx, record).await?;
        if options.delete_associated_messages {
            let removed = self
                .messages
                .delete_by_associated_record(ctx, &record.id)
                .await?;
            debug!(record_id = %record.id, removed, "Deleted credential exchange messages");
        }
        Ok(())
    }
}
