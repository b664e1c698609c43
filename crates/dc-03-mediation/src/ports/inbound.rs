//! Driving ports (API - Inbound)

use async_trait::async_trait;
use shared_storage::{Query, QueryOptions};
use shared_types::{AgentContext, ConnectionRecord, InboundMessageContext};

use crate::domain::{KeylistUpdate, MediationRecord, MediationRole};
use crate::error::MediationResult;
use crate::messages::{
    KeylistUpdateMessage, KeylistUpdateResponseMessage, MediationDenyMessage,
    MediationGrantMessage, MediationRequestMessage,
};

/// Outbound message together with the record it belongs to.
#[derive(Debug, Clone)]
pub struct MessageAndRecord<M> {
    pub message: M,
    pub record: MediationRecord,
}

/// Coordinate mediation engine for both roles.
///
/// Mediator side: process request, grant or deny, process keylist updates.
/// Recipient side: request, process grant or deny, send keylist updates and
/// apply the mediator's answer.
#[async_trait]
pub trait MediationApi: Send + Sync {
    // ---- mediator ----

    /// New `requested` record for the inbound connection.
    async fn process_mediation_request(
        &self,
        inbound: &InboundMessageContext<MediationRequestMessage>,
    ) -> MediationResult<MediationRecord>;

    async fn create_grant_mediation_message(
        &self,
        ctx: &AgentContext,
        record: MediationRecord,
    ) -> MediationResult<MessageAndRecord<MediationGrantMessage>>;

    async fn create_deny_mediation_message(
        &self,
        ctx: &AgentContext,
        record: MediationRecord,
    ) -> MediationResult<MessageAndRecord<MediationDenyMessage>>;

    /// Apply the updates to the connection's routing table and report the
    /// result of each one.
    async fn process_keylist_update_request(
        &self,
        inbound: &InboundMessageContext<KeylistUpdateMessage>,
    ) -> MediationResult<KeylistUpdateResponseMessage>;

    // ---- recipient ----

    async fn create_request(
        &self,
        ctx: &AgentContext,
        connection: &ConnectionRecord,
    ) -> MediationResult<MessageAndRecord<MediationRequestMessage>>;

    async fn process_mediation_grant(
        &self,
        inbound: &InboundMessageContext<MediationGrantMessage>,
    ) -> MediationResult<MediationRecord>;

    async fn process_mediation_deny(
        &self,
        inbound: &InboundMessageContext<MediationDenyMessage>,
    ) -> MediationResult<MediationRecord>;

    /// `keylist-update` for a granted recipient record.
    async fn create_keylist_update_message(
        &self,
        ctx: &AgentContext,
        record: &MediationRecord,
        updates: Vec<KeylistUpdate>,
    ) -> MediationResult<KeylistUpdateMessage>;

    async fn process_keylist_update_results(
        &self,
        inbound: &InboundMessageContext<KeylistUpdateResponseMessage>,
    ) -> MediationResult<MediationRecord>;

    async fn find_default_mediator(
        &self,
        ctx: &AgentContext,
    ) -> MediationResult<Option<MediationRecord>>;

    /// Mark `record` as the default mediator, clearing the mark elsewhere.
    async fn set_default_mediator(
        &self,
        ctx: &AgentContext,
        record: &mut MediationRecord,
    ) -> MediationResult<()>;

    async fn clear_default_mediator(&self, ctx: &AgentContext) -> MediationResult<()>;

    /// The mediator to route through: `mediator_id` when given, otherwise
    /// the default mediator, which must be granted.
    async fn discover_mediation(
        &self,
        ctx: &AgentContext,
        mediator_id: Option<&str>,
    ) -> MediationResult<Option<MediationRecord>>;

    // ---- records ----

    async fn get_by_id(&self, ctx: &AgentContext, record_id: &str)
        -> MediationResult<MediationRecord>;

    async fn find_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> MediationResult<Option<MediationRecord>>;

    async fn find_by_connection_id(
        &self,
        ctx: &AgentContext,
        connection_id: &str,
        role: MediationRole,
    ) -> MediationResult<Option<MediationRecord>>;

    /// Mediator side: the record routing for `recipient_key`.
    async fn find_by_recipient_key(
        &self,
        ctx: &AgentContext,
        recipient_key: &str,
    ) -> MediationResult<Option<MediationRecord>>;

    async fn get_all(&self, ctx: &AgentContext) -> MediationResult<Vec<MediationRecord>>;

    async fn find_all_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> MediationResult<Vec<MediationRecord>>;
}
