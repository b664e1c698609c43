//! Driving ports (API - Inbound)

use async_trait::async_trait;
use shared_storage::{Query, QueryOptions};
use shared_types::{AgentContext, ConnectionRecord, InboundMessageContext};

use crate::domain::{ActionMenu, ActionMenuRecord, ActionMenuRole, ActionMenuSelection};
use crate::error::ActionMenuResult;
use crate::messages::{
    ActionMenuProblemReportMessage, MenuMessage, MenuRequestMessage, PerformMessage,
};

/// Outbound message together with the record it belongs to.
#[derive(Debug, Clone)]
pub struct MessageAndRecord<M> {
    pub message: M,
    pub record: ActionMenuRecord,
}

#[derive(Debug, Clone)]
pub struct CreateRequestOptions {
    pub connection: ConnectionRecord,
}

#[derive(Debug, Clone)]
pub struct CreateMenuOptions {
    pub connection: ConnectionRecord,
    pub menu: ActionMenu,
}

#[derive(Debug, Clone)]
pub struct CreatePerformOptions {
    pub action_menu_record: ActionMenuRecord,
    pub performed_action: ActionMenuSelection,
}

#[derive(Debug, Clone)]
pub struct ClearMenuOptions {
    pub action_menu_record: ActionMenuRecord,
}

/// Lookup by connection and role, optionally narrowed to one thread.
#[derive(Debug, Clone)]
pub struct FindMenuOptions {
    pub connection_id: String,
    pub role: ActionMenuRole,
    pub thread_id: Option<String>,
}

/// Action menu exchange engine.
///
/// `create_*` build an outbound message and persist the record; `process_*`
/// apply an inbound message to the record.
#[async_trait]
pub trait ActionMenuApi: Send + Sync {
    /// Requester asks for the root menu. Resets any existing exchange.
    async fn create_request(
        &self,
        ctx: &AgentContext,
        options: CreateRequestOptions,
    ) -> ActionMenuResult<MessageAndRecord<MenuRequestMessage>>;

    /// Responder receives a menu request. Resets any existing exchange.
    async fn process_request(
        &self,
        inbound: &InboundMessageContext<MenuRequestMessage>,
    ) -> ActionMenuResult<ActionMenuRecord>;

    /// Responder publishes a menu.
    async fn create_menu(
        &self,
        ctx: &AgentContext,
        options: CreateMenuOptions,
    ) -> ActionMenuResult<MessageAndRecord<MenuMessage>>;

    /// Requester receives a menu.
    async fn process_menu(
        &self,
        inbound: &InboundMessageContext<MenuMessage>,
    ) -> ActionMenuResult<ActionMenuRecord>;

    /// Requester selects an option.
    async fn create_perform(
        &self,
        ctx: &AgentContext,
        options: CreatePerformOptions,
    ) -> ActionMenuResult<MessageAndRecord<PerformMessage>>;

    /// Responder receives a selection.
    async fn process_perform(
        &self,
        inbound: &InboundMessageContext<PerformMessage>,
    ) -> ActionMenuResult<ActionMenuRecord>;

    /// Either side abandons the current menu.
    async fn clear_menu(
        &self,
        ctx: &AgentContext,
        options: ClearMenuOptions,
    ) -> ActionMenuResult<ActionMenuRecord>;

    /// Requester learns its selection could not be processed.
    async fn process_problem_report(
        &self,
        inbound: &InboundMessageContext<ActionMenuProblemReportMessage>,
    ) -> ActionMenuResult<ActionMenuRecord>;

    async fn find_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> ActionMenuResult<Option<ActionMenuRecord>>;

    async fn find(
        &self,
        ctx: &AgentContext,
        options: &FindMenuOptions,
    ) -> ActionMenuResult<Option<ActionMenuRecord>>;

    async fn find_all_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> ActionMenuResult<Vec<ActionMenuRecord>>;
}
