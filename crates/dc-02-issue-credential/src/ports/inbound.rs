//! Driving ports (API - Inbound)

use async_trait::async_trait;
use shared_storage::{Query, QueryOptions};
use shared_types::{AgentContext, Attachment, ConnectionRecord, InboundMessageContext};

use crate::domain::{
    AutoAcceptCredential, CredentialExchangeRecord, CredentialPreview, CredentialPreviewAttribute,
    CredentialRole, CredentialState,
};
use crate::error::CredentialResult;
use crate::messages::{
    CredentialAckMessage, CredentialProblemReportMessage, IssueCredentialMessage,
    OfferCredentialMessage, ProposeCredentialMessage, RequestCredentialMessage,
};
use crate::ports::outbound::CredentialFormatInput;

/// Outbound message together with the record it belongs to.
#[derive(Debug, Clone)]
pub struct MessageAndRecord<M> {
    pub message: M,
    pub record: CredentialExchangeRecord,
}

/// Holder starts an exchange by proposing a credential.
#[derive(Debug, Clone)]
pub struct CreateProposalOptions {
    pub connection: ConnectionRecord,
    pub credential_proposal: Option<CredentialPreview>,
    pub cred_def_id: Option<String>,
    pub schema_id: Option<String>,
    pub schema_issuer_did: Option<String>,
    pub schema_name: Option<String>,
    pub schema_version: Option<String>,
    pub issuer_did: Option<String>,
    pub linked_attachments: Vec<Attachment>,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

impl CreateProposalOptions {
    pub fn new(connection: ConnectionRecord, credential_proposal: CredentialPreview) -> Self {
        Self {
            connection,
            credential_proposal: Some(credential_proposal),
            cred_def_id: None,
            schema_id: None,
            schema_issuer_did: None,
            schema_name: None,
            schema_version: None,
            issuer_did: None,
            linked_attachments: Vec::new(),
            comment: None,
            auto_accept_credential: None,
        }
    }
}

/// Issuer answers a proposal with an offer. Missing values are taken from
/// the proposal.
#[derive(Debug, Clone)]
pub struct AcceptProposalOptions {
    pub credential_record: CredentialExchangeRecord,
    pub cred_def_id: Option<String>,
    pub attributes: Option<Vec<CredentialPreviewAttribute>>,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

impl AcceptProposalOptions {
    pub fn new(credential_record: CredentialExchangeRecord) -> Self {
        Self {
            credential_record,
            cred_def_id: None,
            attributes: None,
            comment: None,
            auto_accept_credential: None,
        }
    }
}

/// Issuer answers a proposal with an offer of different content.
#[derive(Debug, Clone)]
pub struct NegotiateProposalOptions {
    pub credential_record: CredentialExchangeRecord,
    pub offer: CredentialFormatInput,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

/// Issuer starts an exchange with an offer. Without a connection the offer
/// is meant to be delivered connection-less.
#[derive(Debug, Clone)]
pub struct CreateOfferOptions {
    pub connection: Option<ConnectionRecord>,
    pub offer: CredentialFormatInput,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

#[derive(Debug, Clone)]
pub struct AcceptOfferOptions {
    pub credential_record: CredentialExchangeRecord,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

impl AcceptOfferOptions {
    pub fn new(credential_record: CredentialExchangeRecord) -> Self {
        Self {
            credential_record,
            comment: None,
            auto_accept_credential: None,
        }
    }
}

/// Holder answers an offer with a counter proposal.
#[derive(Debug, Clone)]
pub struct NegotiateOfferOptions {
    pub credential_record: CredentialExchangeRecord,
    pub credential_proposal: CredentialPreview,
    pub cred_def_id: Option<String>,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

#[derive(Debug, Clone)]
pub struct AcceptRequestOptions {
    pub credential_record: CredentialExchangeRecord,
    pub comment: Option<String>,
    pub auto_accept_credential: Option<AutoAcceptCredential>,
}

impl AcceptRequestOptions {
    pub fn new(credential_record: CredentialExchangeRecord) -> Self {
        Self {
            credential_record,
            comment: None,
            auto_accept_credential: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceptCredentialOptions {
    pub credential_record: CredentialExchangeRecord,
}

#[derive(Debug, Clone)]
pub struct CreateProblemReportOptions {
    pub credential_record: CredentialExchangeRecord,
    pub description: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteCredentialOptions {
    pub delete_associated_messages: bool,
}

impl Default for DeleteCredentialOptions {
    fn default() -> Self {
        Self {
            delete_associated_messages: true,
        }
    }
}

/// Issue credential v1 exchange engine.
///
/// Holder side: propose, process offer, accept or negotiate or decline the
/// offer, process credential, accept credential. Issuer side: process
/// proposal, accept or negotiate it (or start with an offer), process
/// request, accept request, process ack.
#[async_trait]
pub trait CredentialsApi: Send + Sync {
    async fn create_proposal(
        &self,
        ctx: &AgentContext,
        options: CreateProposalOptions,
    ) -> CredentialResult<MessageAndRecord<ProposeCredentialMessage>>;

    async fn process_proposal(
        &self,
        inbound: &InboundMessageContext<ProposeCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn accept_proposal(
        &self,
        ctx: &AgentContext,
        options: AcceptProposalOptions,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>>;

    async fn negotiate_proposal(
        &self,
        ctx: &AgentContext,
        options: NegotiateProposalOptions,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>>;

    async fn create_offer(
        &self,
        ctx: &AgentContext,
        options: CreateOfferOptions,
    ) -> CredentialResult<MessageAndRecord<OfferCredentialMessage>>;

    async fn process_offer(
        &self,
        inbound: &InboundMessageContext<OfferCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn accept_offer(
        &self,
        ctx: &AgentContext,
        options: AcceptOfferOptions,
    ) -> CredentialResult<MessageAndRecord<RequestCredentialMessage>>;

    async fn negotiate_offer(
        &self,
        ctx: &AgentContext,
        options: NegotiateOfferOptions,
    ) -> CredentialResult<MessageAndRecord<ProposeCredentialMessage>>;

    async fn decline_offer(
        &self,
        ctx: &AgentContext,
        credential_record: CredentialExchangeRecord,
    ) -> CredentialResult<CredentialExchangeRecord>;

    /// Always fails: v1 exchanges cannot start from a request.
    async fn create_request(
        &self,
        ctx: &AgentContext,
    ) -> CredentialResult<MessageAndRecord<RequestCredentialMessage>>;

    async fn process_request(
        &self,
        inbound: &InboundMessageContext<RequestCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn accept_request(
        &self,
        ctx: &AgentContext,
        options: AcceptRequestOptions,
    ) -> CredentialResult<MessageAndRecord<IssueCredentialMessage>>;

    async fn process_credential(
        &self,
        inbound: &InboundMessageContext<IssueCredentialMessage>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn accept_credential(
        &self,
        ctx: &AgentContext,
        options: AcceptCredentialOptions,
    ) -> CredentialResult<MessageAndRecord<CredentialAckMessage>>;

    async fn process_ack(
        &self,
        inbound: &InboundMessageContext<CredentialAckMessage>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    /// Problem report on the record's thread. The record is not changed.
    async fn create_problem_report(
        &self,
        ctx: &AgentContext,
        options: CreateProblemReportOptions,
    ) -> CredentialResult<CredentialProblemReportMessage>;

    /// Stores `"<code>: <en>"` as the record's error message.
    async fn process_problem_report(
        &self,
        inbound: &InboundMessageContext<CredentialProblemReportMessage>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn should_auto_respond_to_proposal(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        proposal: &ProposeCredentialMessage,
    ) -> CredentialResult<bool>;

    async fn should_auto_respond_to_offer(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        offer: &OfferCredentialMessage,
    ) -> CredentialResult<bool>;

    async fn should_auto_respond_to_request(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        request: &RequestCredentialMessage,
    ) -> CredentialResult<bool>;

    async fn should_auto_respond_to_credential(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        credential: &IssueCredentialMessage,
    ) -> CredentialResult<bool>;

    async fn find_proposal_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<ProposeCredentialMessage>>;

    async fn find_offer_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<OfferCredentialMessage>>;

    async fn find_request_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<RequestCredentialMessage>>;

    async fn find_credential_message(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<IssueCredentialMessage>>;

    async fn get_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn find_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> CredentialResult<Option<CredentialExchangeRecord>>;

    async fn get_all(&self, ctx: &AgentContext) -> CredentialResult<Vec<CredentialExchangeRecord>>;

    async fn find_all_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> CredentialResult<Vec<CredentialExchangeRecord>>;

    /// The record on `thread_id`; `None` connection places no constraint.
    async fn get_by_thread_and_connection_id(
        &self,
        ctx: &AgentContext,
        thread_id: &str,
        connection_id: Option<&str>,
        role: Option<CredentialRole>,
    ) -> CredentialResult<CredentialExchangeRecord>;

    async fn find_by_thread_and_connection_id(
        &self,
        ctx: &AgentContext,
        thread_id: &str,
        connection_id: Option<&str>,
        role: Option<CredentialRole>,
    ) -> CredentialResult<Option<CredentialExchangeRecord>>;

    /// Persist a new state and publish the transition.
    async fn update_state(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
        new_state: CredentialState,
    ) -> CredentialResult<()>;

    /// Persist without publishing.
    async fn update(
        &self,
        ctx: &AgentContext,
        record: &mut CredentialExchangeRecord,
    ) -> CredentialResult<()>;

    async fn delete(
        &self,
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        options: DeleteCredentialOptions,
    ) -> CredentialResult<()>;
}
