//! Action Menu Service - exchange state machine
//!
//! Every transition follows the same steps: look up the record, assert, mutate,
//! persist (save when new, update otherwise), then publish one
//! `StateChanged` event carrying the previous state and a snapshot.

use std::sync::Arc;

use agent_telemetry::{log_exchange_event, metric_inc, STATE_TRANSITIONS};
use async_trait::async_trait;
use shared_storage::{Query, QueryOptions, Repository};
use shared_types::{AgentContext, AgentMessage, InboundMessageContext};
use tracing::{debug, info};

use crate::domain::{ActionMenuRecord, ActionMenuRole, ActionMenuState};
use crate::error::{ActionMenuError, ActionMenuProblemReportReason, ActionMenuResult};
use crate::events::ActionMenuEvent;
use crate::messages::{
    ActionMenuProblemReportMessage, MenuMessage, MenuRequestMessage, PerformMessage,
    PROTOCOL_NAME,
};
use crate::ports::inbound::{
    ActionMenuApi, ClearMenuOptions, CreateMenuOptions, CreatePerformOptions,
    CreateRequestOptions, FindMenuOptions, MessageAndRecord,
};
use crate::ports::outbound::{ActionMenuEventPublisher, ActionMenuStore};

/// Action menu service.
pub struct ActionMenuService<S, P>
where
    S: ActionMenuStore + ?Sized,
    P: ActionMenuEventPublisher + ?Sized,
{
    repository: Repository<ActionMenuRecord, S>,
    events: Arc<P>,
}

impl<S, P> ActionMenuService<S, P>
where
    S: ActionMenuStore + ?Sized,
    P: ActionMenuEventPublisher + ?Sized,
{
    pub fn new(storage: Arc<S>, events: Arc<P>) -> Self {
        Self {
            repository: Repository::new(storage),
            events,
        }
    }

    /// Put an existing record back at the start of a flow, or create it.
    ///
    /// A record in `null` keeps its thread; any other state adopts
    /// `thread_id`.
    async fn reset_or_create(
        &self,
        ctx: &AgentContext,
        connection_id: &str,
        role: ActionMenuRole,
        state: ActionMenuState,
        thread_id: &str,
    ) -> ActionMenuResult<ActionMenuRecord> {
        let existing = self
            .find(
                ctx,
                &FindMenuOptions {
                    connection_id: connection_id.to_string(),
                    role,
                    thread_id: None,
                },
            )
            .await?;

        match existing {
            Some(mut record) => {
                let previous_state = record.state;
                if previous_state != ActionMenuState::Null {
                    record.thread_id = thread_id.to_string();
                }
                record.state = state;
                record.clear_payload();

                self.repository.update(ctx, &mut record).await?;
                self.emit_state_changed(ctx, &record, Some(previous_state))
                    .await;
                Ok(record)
            }
            None => {
                let record = ActionMenuRecord::new(connection_id, role, state, thread_id);
                self.save_new(ctx, &record).await?;
                Ok(record)
            }
        }
    }

    async fn save_new(&self, ctx: &AgentContext, record: &ActionMenuRecord) -> ActionMenuResult<()> {
        self.repository.save(ctx, record).await?;
        info!(
            record_id = %record.id,
            connection_id = %record.connection_id,
            role = %record.role,
            "Action menu exchange created"
        );
        self.emit_state_changed(ctx, record, None).await;
        Ok(())
    }

    async fn emit_state_changed(
        &self,
        ctx: &AgentContext,
        record: &ActionMenuRecord,
        previous_state: Option<ActionMenuState>,
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
            .publish(ActionMenuEvent::state_changed(ctx, record, previous_state))
            .await;
    }
}

#[async_trait]
impl<S, P> ActionMenuApi for ActionMenuService<S, P>
where
    S: ActionMenuStore + ?Sized,
    P: ActionMenuEventPublisher + ?Sized,
{
    async fn create_request(
        &self,
        ctx: &AgentContext,
        options: CreateRequestOptions,
    ) -> ActionMenuResult<MessageAndRecord<MenuRequestMessage>> {
        options.connection.assert_ready()?;

        let mut message = MenuRequestMessage::new();
        let record = self
            .reset_or_create(
                ctx,
                &options.connection.id,
                ActionMenuRole::Requester,
                ActionMenuState::AwaitingRootMenu,
                message.id(),
            )
            .await?;

        if record.thread_id != message.id() {
            message.set_thread(record.thread_id.clone(), None);
        }

        Ok(MessageAndRecord { message, record })
    }

    async fn process_request(
        &self,
        inbound: &InboundMessageContext<MenuRequestMessage>,
    ) -> ActionMenuResult<ActionMenuRecord> {
        let message = &inbound.message;
        debug!(message_id = %message.id(), "Processing menu request");

        let connection = inbound.assert_ready_connection()?;

        self.reset_or_create(
            &inbound.agent_context,
            &connection.id,
            ActionMenuRole::Responder,
            ActionMenuState::PreparingRootMenu,
            message.thread_id(),
        )
        .await
    }

    async fn create_menu(
        &self,
        ctx: &AgentContext,
        options: CreateMenuOptions,
    ) -> ActionMenuResult<MessageAndRecord<MenuMessage>> {
        let CreateMenuOptions { connection, menu } = options;
        connection.assert_ready()?;
        menu.assert_unique_options()?;

        let mut message = MenuMessage::new(&menu);

        let existing = self
            .find(
                ctx,
                &FindMenuOptions {
                    connection_id: connection.id.clone(),
                    role: ActionMenuRole::Responder,
                    thread_id: None,
                },
            )
            .await?;

        let record = match existing {
            Some(mut record) => {
                // Any state resets; a cleared record starts a new thread.
                if record.state != ActionMenuState::Null {
                    message.set_thread(record.thread_id.clone(), None);
                }

                let previous_state = record.state;
                record.thread_id = message.thread_id().to_string();
                record.state = ActionMenuState::AwaitingSelection;
                record.menu = Some(menu);
                record.performed_action = None;

                self.repository.update(ctx, &mut record).await?;
                self.emit_state_changed(ctx, &record, Some(previous_state))
                    .await;
                record
            }
            None => {
                let record = ActionMenuRecord::new(
                    connection.id.clone(),
                    ActionMenuRole::Responder,
                    ActionMenuState::AwaitingSelection,
                    message.thread_id(),
                )
                .with_menu(menu);
                self.save_new(ctx, &record).await?;
                record
            }
        };

        Ok(MessageAndRecord { message, record })
    }

    async fn process_menu(
        &self,
        inbound: &InboundMessageContext<MenuMessage>,
    ) -> ActionMenuResult<ActionMenuRecord> {
        let message = &inbound.message;
        let ctx = &inbound.agent_context;
        debug!(message_id = %message.id(), "Processing action menu");

        let connection = inbound.assert_ready_connection()?;
        let menu = message.to_menu()?;

        let existing = self
            .find(
                ctx,
                &FindMenuOptions {
                    connection_id: connection.id.clone(),
                    role: ActionMenuRole::Requester,
                    thread_id: None,
                },
            )
            .await?;

        match existing {
            Some(mut record) => {
                let previous_state = record.state;
                record.state = ActionMenuState::PreparingSelection;
                record.menu = Some(menu);
                record.thread_id = message.thread_id().to_string();
                record.performed_action = None;

                self.repository.update(ctx, &mut record).await?;
                self.emit_state_changed(ctx, &record, Some(previous_state))
                    .await;
                Ok(record)
            }
            None => {
                let record = ActionMenuRecord::new(
                    connection.id.clone(),
                    ActionMenuRole::Requester,
                    ActionMenuState::PreparingSelection,
                    message.thread_id(),
                )
                .with_menu(menu);
                self.save_new(ctx, &record).await?;
                Ok(record)
            }
        }
    }

    async fn create_perform(
        &self,
        ctx: &AgentContext,
        options: CreatePerformOptions,
    ) -> ActionMenuResult<MessageAndRecord<PerformMessage>> {
        let CreatePerformOptions {
            action_menu_record: mut record,
            performed_action,
        } = options;

        record.assert_role(ActionMenuRole::Requester)?;
        record.assert_state(&[ActionMenuState::PreparingSelection])?;
        record.assert_valid_selection(&performed_action.name)?;

        let previous_state = record.state;
        let message = PerformMessage::new(&performed_action, &record.thread_id);

        record.performed_action = Some(performed_action);
        record.state = ActionMenuState::Done;

        self.repository.update(ctx, &mut record).await?;
        self.emit_state_changed(ctx, &record, Some(previous_state))
            .await;

        Ok(MessageAndRecord { message, record })
    }

    async fn process_perform(
        &self,
        inbound: &InboundMessageContext<PerformMessage>,
    ) -> ActionMenuResult<ActionMenuRecord> {
        let message = &inbound.message;
        let ctx = &inbound.agent_context;
        debug!(message_id = %message.id(), "Processing action menu perform");

        let connection = inbound.assert_ready_connection()?;

        let mut record = self
            .find(
                ctx,
                &FindMenuOptions {
                    connection_id: connection.id.clone(),
                    role: ActionMenuRole::Responder,
                    thread_id: Some(message.thread_id().to_string()),
                },
            )
            .await?
            .ok_or_else(|| {
                ActionMenuError::NotFound(format!(
                    "No Action Menu found with thread id {}",
                    message.thread_id()
                ))
            })?;

        // A cleared menu means the requester has to ask for a new one.
        if record.state == ActionMenuState::Null {
            return Err(ActionMenuError::ProblemReport {
                message: "Action Menu has been cleared by the responder".into(),
                reason: ActionMenuProblemReportReason::Timeout,
            });
        }
        record.assert_state(&[ActionMenuState::AwaitingSelection])?;
        record.assert_valid_selection(&message.name)?;

        let previous_state = record.state;
        record.state = ActionMenuState::Done;
        record.performed_action = Some(message.selection());

        self.repository.update(ctx, &mut record).await?;
        self.emit_state_changed(ctx, &record, Some(previous_state))
            .await;

        Ok(record)
    }

    async fn clear_menu(
        &self,
        ctx: &AgentContext,
        options: ClearMenuOptions,
    ) -> ActionMenuResult<ActionMenuRecord> {
        let mut record = options.action_menu_record;
        let previous_state = record.state;

        record.state = ActionMenuState::Null;
        record.clear_payload();

        self.repository.update(ctx, &mut record).await?;
        self.emit_state_changed(ctx, &record, Some(previous_state))
            .await;

        Ok(record)
    }

    async fn process_problem_report(
        &self,
        inbound: &InboundMessageContext<ActionMenuProblemReportMessage>,
    ) -> ActionMenuResult<ActionMenuRecord> {
        let ctx = &inbound.agent_context;
        let connection = inbound.assert_ready_connection()?;
        debug!(
            message_id = %inbound.message.id(),
            code = %inbound.message.body.description.code,
            "Processing action menu problem report"
        );

        let record = self
            .find(
                ctx,
                &FindMenuOptions {
                    connection_id: connection.id.clone(),
                    role: ActionMenuRole::Requester,
                    thread_id: None,
                },
            )
            .await?
            .ok_or_else(|| {
                ActionMenuError::NotFound(format!(
                    "Unable to process action menu problem: record not found for connection id {}",
                    connection.id
                ))
            })?;

        self.clear_menu(
            ctx,
            ClearMenuOptions {
                action_menu_record: record,
            },
        )
        .await
    }

    async fn find_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> ActionMenuResult<Option<ActionMenuRecord>> {
        Ok(self.repository.find_by_id(ctx, record_id).await?)
    }

    async fn find(
        &self,
        ctx: &AgentContext,
        options: &FindMenuOptions,
    ) -> ActionMenuResult<Option<ActionMenuRecord>> {
        let query = Query::and(vec![
            Query::eq("connectionId", options.connection_id.as_str()),
            Query::eq("role", options.role.as_str()),
            Query::eq_opt("threadId", options.thread_id.as_deref()),
        ]);
        Ok(self.repository.find_single_by_query(ctx, &query).await?)
    }

    async fn find_all_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> ActionMenuResult<Vec<ActionMenuRecord>> {
        Ok(self.repository.find_by_query(ctx, query, options).await?)
    }
}
