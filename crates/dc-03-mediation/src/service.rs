//! Mediation Service - coordinate mediation state machine for both roles
//!
//! There is at most one record per (connection, role). A new request on a
//! connection whose mediation was denied or is still pending reuses that
//! record on the new thread; a granted mediation must not be requested again.

use std::sync::Arc;

use agent_telemetry::{log_exchange_event, metric_inc, STATE_TRANSITIONS};
use async_trait::async_trait;
use shared_storage::{Query, QueryOptions, Repository};
use shared_types::{AgentContext, AgentMessage, ConnectionRecord, InboundMessageContext};
use tracing::{debug, info};

use crate::domain::{
    KeylistUpdate, KeylistUpdateAction, KeylistUpdateResult, KeylistUpdated, MediationRecord,
    MediationRole, MediationState, MediatorRouting, DEFAULT_MEDIATOR_TAG,
};
use crate::error::{MediationError, MediationResult};
use crate::events::MediationEvent;
use crate::messages::{
    KeylistUpdateMessage, KeylistUpdateResponseMessage, MediationDenyMessage,
    MediationGrantMessage, MediationRequestMessage, PROTOCOL_NAME,
};
use crate::ports::inbound::{MediationApi, MessageAndRecord};
use crate::ports::outbound::{MediationEventPublisher, MediationStore};

/// Coordinate mediation service.
pub struct MediationService<S, P>
where
    S: MediationStore + ?Sized,
    P: MediationEventPublisher + ?Sized,
{
    repository: Repository<MediationRecord, S>,
    events: Arc<P>,
    routing: Option<MediatorRouting>,
}

impl<S, P> MediationService<S, P>
where
    S: MediationStore + ?Sized,
    P: MediationEventPublisher + ?Sized,
{
    pub fn new(storage: Arc<S>, events: Arc<P>) -> Self {
        Self {
            repository: Repository::new(storage),
            events,
            routing: None,
        }
    }

    /// Endpoint and routing keys handed out when granting mediation.
    /// Without them this agent cannot act as a mediator.
    pub fn with_routing(mut self, routing: MediatorRouting) -> Self {
        self.routing = Some(routing);
        self
    }

    async fn reset_or_create(
        &self,
        ctx: &AgentContext,
        connection_id: &str,
        role: MediationRole,
        thread_id: &str,
    ) -> MediationResult<MediationRecord> {
        match self.find_by_connection_id(ctx, connection_id, role).await? {
            Some(mut record) => {
                record.assert_state(&[MediationState::Requested, MediationState::Denied])?;
                let previous_state = record.state;
                record.thread_id = thread_id.to_string();
                record.state = MediationState::Requested;
                record.endpoint = None;
                record.routing_keys.clear();

                self.repository.update(ctx, &mut record).await?;
                self.emit_state_changed(ctx, &record, Some(previous_state))
                    .await;
                Ok(record)
            }
            None => {
                let record = MediationRecord::new(
                    connection_id,
                    role,
                    MediationState::Requested,
                    thread_id,
                );
                self.repository.save(ctx, &record).await?;
                info!(
                    record_id = %record.id,
                    connection_id = %record.connection_id,
                    role = %record.role,
                    "Mediation requested"
                );
                self.emit_state_changed(ctx, &record, None).await;
                Ok(record)
            }
        }
    }

    async fn update_state(
        &self,
        ctx: &AgentContext,
        record: &mut MediationRecord,
        new_state: MediationState,
    ) -> MediationResult<()> {
        let previous_state = record.state;
        record.state = new_state;
        self.repository.update(ctx, record).await?;
        self.emit_state_changed(ctx, record, Some(previous_state))
            .await;
        Ok(())
    }

    async fn emit_state_changed(
        &self,
        ctx: &AgentContext,
        record: &MediationRecord,
        previous_state: Option<MediationState>,
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
            .publish(MediationEvent::state_changed(ctx, record, previous_state))
            .await;
    }

    async fn connection_record<M: AgentMessage + Sync>(
        &self,
        inbound: &InboundMessageContext<M>,
        role: MediationRole,
    ) -> MediationResult<MediationRecord> {
        let connection = inbound.assert_ready_connection()?;
        self.find_by_connection_id(&inbound.agent_context, &connection.id, role)
            .await?
            .ok_or_else(|| {
                MediationError::NotFound(format!(
                    "No mediation has been requested for this connection id: {}",
                    connection.id
                ))
            })
    }
}

#[async_trait]
impl<S, P> MediationApi for MediationService<S, P>
where
    S: MediationStore + ?Sized,
    P: MediationEventPublisher + ?Sized,
{
    async fn process_mediation_request(
        &self,
        inbound: &InboundMessageContext<MediationRequestMessage>,
    ) -> MediationResult<MediationRecord> {
        let connection = inbound.assert_ready_connection()?;
        debug!(message_id = %inbound.message.id(), "Processing mediation request");

        self.reset_or_create(
            &inbound.agent_context,
            &connection.id,
            MediationRole::Mediator,
            inbound.message.thread_id(),
        )
        .await
    }

    async fn create_grant_mediation_message(
        &self,
        ctx: &AgentContext,
        mut record: MediationRecord,
    ) -> MediationResult<MessageAndRecord<MediationGrantMessage>> {
        record.assert_state(&[MediationState::Requested])?;
        record.assert_role(MediationRole::Mediator)?;
        let routing = self
            .routing
            .as_ref()
            .ok_or(MediationError::MediatorNotInitialized)?;

        self.update_state(ctx, &mut record, MediationState::Granted)
            .await?;

        let message = MediationGrantMessage::new(routing, &record.thread_id);
        Ok(MessageAndRecord { message, record })
    }

    async fn create_deny_mediation_message(
        &self,
        ctx: &AgentContext,
        mut record: MediationRecord,
    ) -> MediationResult<MessageAndRecord<MediationDenyMessage>> {
        record.assert_state(&[MediationState::Requested])?;
        record.assert_role(MediationRole::Mediator)?;

        self.update_state(ctx, &mut record, MediationState::Denied)
            .await?;

        let message = MediationDenyMessage::new(&record.thread_id);
        Ok(MessageAndRecord { message, record })
    }

    async fn process_keylist_update_request(
        &self,
        inbound: &InboundMessageContext<KeylistUpdateMessage>,
    ) -> MediationResult<KeylistUpdateResponseMessage> {
        let message = &inbound.message;
        let mut record = self
            .connection_record(inbound, MediationRole::Mediator)
            .await?;
        record.assert_ready()?;

        let updated: Vec<KeylistUpdated> = message
            .updates
            .iter()
            .map(|update| {
                let changed = match update.action {
                    KeylistUpdateAction::Add => record.add_recipient_key(&update.recipient_key),
                    KeylistUpdateAction::Remove => {
                        record.remove_recipient_key(&update.recipient_key)
                    }
                };
                KeylistUpdated {
                    recipient_key: update.recipient_key.clone(),
                    action: update.action,
                    result: if changed {
                        KeylistUpdateResult::Success
                    } else {
                        KeylistUpdateResult::NoChange
                    },
                }
            })
            .collect();

        self.repository
            .update(&inbound.agent_context, &mut record)
            .await?;
        debug!(
            record_id = %record.id,
            updates = updated.len(),
            recipient_keys = record.recipient_keys.len(),
            "Keylist updated"
        );

        Ok(KeylistUpdateResponseMessage::new(updated, message.thread_id()))
    }

    async fn create_request(
        &self,
        ctx: &AgentContext,
        connection: &ConnectionRecord,
    ) -> MediationResult<MessageAndRecord<MediationRequestMessage>> {
        connection.assert_ready()?;

        let message = MediationRequestMessage::new();
        let record = self
            .reset_or_create(ctx, &connection.id, MediationRole::Recipient, message.id())
            .await?;

        Ok(MessageAndRecord { message, record })
    }

    async fn process_mediation_grant(
        &self,
        inbound: &InboundMessageContext<MediationGrantMessage>,
    ) -> MediationResult<MediationRecord> {
        let message = &inbound.message;
        let mut record = self
            .connection_record(inbound, MediationRole::Recipient)
            .await?;
        record.assert_state(&[MediationState::Requested])?;
        record.assert_role(MediationRole::Recipient)?;

        record.endpoint = message.endpoint.clone();
        record.routing_keys = message.routing_keys.clone();
        self.update_state(&inbound.agent_context, &mut record, MediationState::Granted)
            .await?;

        Ok(record)
    }

    async fn process_mediation_deny(
        &self,
        inbound: &InboundMessageContext<MediationDenyMessage>,
    ) -> MediationResult<MediationRecord> {
        let mut record = self
            .connection_record(inbound, MediationRole::Recipient)
            .await?;
        record.assert_role(MediationRole::Recipient)?;
        record.assert_state(&[MediationState::Requested])?;

        self.update_state(&inbound.agent_context, &mut record, MediationState::Denied)
            .await?;

        Ok(record)
    }

    async fn create_keylist_update_message(
        &self,
        _ctx: &AgentContext,
        record: &MediationRecord,
        updates: Vec<KeylistUpdate>,
    ) -> MediationResult<KeylistUpdateMessage> {
        record.assert_ready()?;
        record.assert_role(MediationRole::Recipient)?;
        if updates.is_empty() {
            return Err(MediationError::Validation(
                "Keylist update must contain at least one update".into(),
            ));
        }
        Ok(KeylistUpdateMessage::new(updates))
    }

    async fn process_keylist_update_results(
        &self,
        inbound: &InboundMessageContext<KeylistUpdateResponseMessage>,
    ) -> MediationResult<MediationRecord> {
        let ctx = &inbound.agent_context;
        let mut record = self
            .connection_record(inbound, MediationRole::Recipient)
            .await?;
        record.assert_ready()?;
        record.assert_role(MediationRole::Recipient)?;

        let keylist = inbound.message.updated.clone();
        for update in keylist.iter().filter(|u| u.is_success()) {
            match update.action {
                KeylistUpdateAction::Add => record.add_recipient_key(&update.recipient_key),
                KeylistUpdateAction::Remove => record.remove_recipient_key(&update.recipient_key),
            };
        }

        self.repository.update(ctx, &mut record).await?;
        debug!(
            record_id = %record.id,
            results = keylist.len(),
            recipient_keys = record.recipient_keys.len(),
            "Mediator confirmed keylist update"
        );
        self.events
            .publish(MediationEvent::keylist_updated(ctx, &record, keylist))
            .await;

        Ok(record)
    }

    async fn find_default_mediator(
        &self,
        ctx: &AgentContext,
    ) -> MediationResult<Option<MediationRecord>> {
        Ok(self
            .repository
            .find_single_by_query(ctx, &Query::eq(DEFAULT_MEDIATOR_TAG, true))
            .await?)
    }

    async fn set_default_mediator(
        &self,
        ctx: &AgentContext,
        record: &mut MediationRecord,
    ) -> MediationResult<()> {
        let current = self
            .repository
            .find_by_query(
                ctx,
                &Query::eq(DEFAULT_MEDIATOR_TAG, true),
                QueryOptions::default(),
            )
            .await?;
        for mut other in current.into_iter().filter(|r| r.id != record.id) {
            other.set_default(false);
            self.repository.update(ctx, &mut other).await?;
        }

        record.set_default(true);
        self.repository.update(ctx, record).await?;
        info!(record_id = %record.id, "Default mediator set");
        Ok(())
    }

    async fn clear_default_mediator(&self, ctx: &AgentContext) -> MediationResult<()> {
        if let Some(mut record) = self.find_default_mediator(ctx).await? {
            record.set_default(false);
            self.repository.update(ctx, &mut record).await?;
        }
        Ok(())
    }

    async fn discover_mediation(
        &self,
        ctx: &AgentContext,
        mediator_id: Option<&str>,
    ) -> MediationResult<Option<MediationRecord>> {
        if let Some(id) = mediator_id {
            return self.get_by_id(ctx, id).await.map(Some);
        }

        match self.find_default_mediator(ctx).await? {
            Some(record) if !record.is_ready() => Err(MediationError::Validation(format!(
                "Mediation State for {} is not granted, but is set as default mediator!",
                record.id
            ))),
            default => Ok(default),
        }
    }

    async fn get_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> MediationResult<MediationRecord> {
        Ok(self.repository.get_by_id(ctx, record_id).await?)
    }

    async fn find_by_id(
        &self,
        ctx: &AgentContext,
        record_id: &str,
    ) -> MediationResult<Option<MediationRecord>> {
        Ok(self.repository.find_by_id(ctx, record_id).await?)
    }

    async fn find_by_connection_id(
        &self,
        ctx: &AgentContext,
        connection_id: &str,
        role: MediationRole,
    ) -> MediationResult<Option<MediationRecord>> {
        let query = Query::and(vec![
            Query::eq("connectionId", connection_id),
            Query::eq("role", role.as_str()),
        ]);
        Ok(self.repository.find_single_by_query(ctx, &query).await?)
    }

    async fn find_by_recipient_key(
        &self,
        ctx: &AgentContext,
        recipient_key: &str,
    ) -> MediationResult<Option<MediationRecord>> {
        let query = Query::and(vec![
            Query::eq("role", MediationRole::Mediator.as_str()),
            Query::eq("recipientKeys", recipient_key),
        ]);
        Ok(self.repository.find_single_by_query(ctx, &query).await?)
    }

    async fn get_all(&self, ctx: &AgentContext) -> MediationResult<Vec<MediationRecord>> {
        Ok(self.repository.get_all(ctx).await?)
    }

    async fn find_all_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> MediationResult<Vec<MediationRecord>> {
        Ok(self.repository.find_by_query(ctx, query, options).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
    use shared_storage::InMemoryStorageService;
    use shared_types::DidExchangeState;

    type TestService = MediationService<InMemoryStorageService, InMemoryEventBus<MediationEvent>>;

    struct Party {
        service: TestService,
        events: Subscription<MediationEvent>,
        ctx: AgentContext,
        connection: ConnectionRecord,
    }

    impl Party {
        fn new(routing: Option<MediatorRouting>) -> Self {
            let bus = Arc::new(InMemoryEventBus::new());
            let events = bus.subscribe(EventFilter::all());
            let mut service = MediationService::new(Arc::new(InMemoryStorageService::new()), bus);
            if let Some(routing) = routing {
                service = service.with_routing(routing);
            }
            Self {
                service,
                events,
                ctx: AgentContext::default(),
                connection: ConnectionRecord::new(DidExchangeState::Completed),
            }
        }

        fn mediator() -> Self {
            Self::new(Some(MediatorRouting {
                endpoint: Some("https://mediator.example/didcomm".into()),
                routing_keys: vec!["mediator-routing-key".into()],
            }))
        }

        fn recipient() -> Self {
            Self::new(None)
        }

        fn inbound<M>(&self, message: M) -> InboundMessageContext<M> {
            InboundMessageContext::new(message, self.ctx.clone())
                .with_connection(self.connection.clone())
        }

        fn transitions(&mut self) -> Vec<(Option<MediationState>, MediationState)> {
            self.events
                .drain()
                .into_iter()
                .filter_map(|event| match event {
                    MediationEvent::StateChanged(e) => {
                        Some((e.previous_state, e.mediation_record.state))
                    }
                    MediationEvent::KeylistUpdated(_) => None,
                })
                .collect()
        }

        /// Request and grant mediation; returns (mediator record, recipient record).
        async fn granted_with(
            mediator: &mut Party,
            recipient: &mut Party,
        ) -> (MediationRecord, MediationRecord) {
            let request = recipient
                .service
                .create_request(&recipient.ctx, &recipient.connection)
                .await
                .unwrap();
            let record = mediator
                .service
                .process_mediation_request(&mediator.inbound(request.message))
                .await
                .unwrap();
            let grant = mediator
                .service
                .create_grant_mediation_message(&mediator.ctx, record)
                .await
                .unwrap();
            let recipient_record = recipient
                .service
                .process_mediation_grant(&recipient.inbound(grant.message))
                .await
                .unwrap();
            mediator.transitions();
            recipient.transitions();
            (grant.record, recipient_record)
        }
    }

    #[tokio::test]
    async fn test_request_and_grant() {
        let mut mediator = Party::mediator();
        let mut recipient = Party::recipient();

        let request = recipient
            .service
            .create_request(&recipient.ctx, &recipient.connection)
            .await
            .unwrap();
        assert_eq!(request.record.state, MediationState::Requested);
        assert_eq!(request.record.role, MediationRole::Recipient);
        assert_eq!(request.record.thread_id, request.message.id());

        let record = mediator
            .service
            .process_mediation_request(&mediator.inbound(request.message.clone()))
            .await
            .unwrap();
        assert_eq!(record.role, MediationRole::Mediator);
        assert_eq!(record.thread_id, request.message.id());
        assert_eq!(record.connection_id, mediator.connection.id);

        let grant = mediator
            .service
            .create_grant_mediation_message(&mediator.ctx, record)
            .await
            .unwrap();
        assert_eq!(grant.record.state, MediationState::Granted);
        assert_eq!(grant.message.thread_id(), request.message.id());

        let granted = recipient
            .service
            .process_mediation_grant(&recipient.inbound(grant.message))
            .await
            .unwrap();
        assert_eq!(granted.state, MediationState::Granted);
        assert_eq!(
            granted.endpoint.as_deref(),
            Some("https://mediator.example/didcomm")
        );
        assert_eq!(granted.routing_keys, vec!["mediator-routing-key".to_string()]);

        assert_eq!(
            mediator.transitions(),
            vec![
                (None, MediationState::Requested),
                (Some(MediationState::Requested), MediationState::Granted),
            ]
        );
        assert_eq!(
            recipient.transitions(),
            vec![
                (None, MediationState::Requested),
                (Some(MediationState::Requested), MediationState::Granted),
            ]
        );
    }

    #[tokio::test]
    async fn test_grant_without_routing_fails_and_keeps_state() {
        let mediator = Party::recipient();
        let record = mediator
            .service
            .process_mediation_request(&mediator.inbound(MediationRequestMessage::new()))
            .await
            .unwrap();

        let err = mediator
            .service
            .create_grant_mediation_message(&mediator.ctx, record.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::MediatorNotInitialized));

        let stored = mediator
            .service
            .get_by_id(&mediator.ctx, &record.id)
            .await
            .unwrap();
        assert_eq!(stored.state, MediationState::Requested);
    }

    #[tokio::test]
    async fn test_deny() {
        let mut mediator = Party::mediator();
        let mut recipient = Party::recipient();

        let request = recipient
            .service
            .create_request(&recipient.ctx, &recipient.connection)
            .await
            .unwrap();
        let record = mediator
            .service
            .process_mediation_request(&mediator.inbound(request.message))
            .await
            .unwrap();
        let deny = mediator
            .service
            .create_deny_mediation_message(&mediator.ctx, record)
            .await
            .unwrap();
        assert_eq!(deny.record.state, MediationState::Denied);

        let denied = recipient
            .service
            .process_mediation_deny(&recipient.inbound(deny.message))
            .await
            .unwrap();
        assert_eq!(denied.state, MediationState::Denied);
        assert!(denied.endpoint.is_none());

        // Denied mediation cannot be granted afterwards
        let err = mediator
            .service
            .create_grant_mediation_message(&mediator.ctx, deny.record)
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::InvalidState { .. }));
        assert_eq!(mediator.transitions().len(), 2);
        assert_eq!(recipient.transitions().len(), 2);
    }

    #[tokio::test]
    async fn test_grant_on_recipient_record_rejected() {
        let recipient = Party::mediator();
        let request = recipient
            .service
            .create_request(&recipient.ctx, &recipient.connection)
            .await
            .unwrap();

        let err = recipient
            .service
            .create_grant_mediation_message(&recipient.ctx, request.record)
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::InvalidRole { .. }));
    }

    #[tokio::test]
    async fn test_grant_without_request_not_found() {
        let recipient = Party::recipient();
        let grant = MediationGrantMessage::new(&MediatorRouting::default(), "thread-1");

        let err = recipient
            .service
            .process_mediation_grant(&recipient.inbound(grant))
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::NotFound(_)));
        assert!(err.to_string().contains(&recipient.connection.id));
    }

    #[tokio::test]
    async fn test_repeat_request_reuses_denied_record() {
        let mut mediator = Party::mediator();
        let first = mediator
            .service
            .process_mediation_request(&mediator.inbound(MediationRequestMessage::new()))
            .await
            .unwrap();
        mediator
            .service
            .create_deny_mediation_message(&mediator.ctx, first.clone())
            .await
            .unwrap();
        mediator.transitions();

        let second_request = MediationRequestMessage::new();
        let second = mediator
            .service
            .process_mediation_request(&mediator.inbound(second_request.clone()))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.thread_id, second_request.id());
        assert_eq!(second.state, MediationState::Requested);
        assert_eq!(
            mediator.transitions(),
            vec![(Some(MediationState::Denied), MediationState::Requested)]
        );
        assert_eq!(mediator.service.get_all(&mediator.ctx).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_request_on_granted_mediation_rejected() {
        let mut mediator = Party::mediator();
        let mut recipient = Party::recipient();
        Party::granted_with(&mut mediator, &mut recipient).await;

        let err = mediator
            .service
            .process_mediation_request(&mediator.inbound(MediationRequestMessage::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_keylist_update_requires_grant() {
        let mediator = Party::mediator();
        mediator
            .service
            .process_mediation_request(&mediator.inbound(MediationRequestMessage::new()))
            .await
            .unwrap();

        let update = KeylistUpdateMessage::new(vec![KeylistUpdate::add("key-a")]);
        let err = mediator
            .service
            .process_keylist_update_request(&mediator.inbound(update))
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_keylist_update_results() {
        let mut mediator = Party::mediator();
        let mut recipient = Party::recipient();
        let (mediator_record, _) = Party::granted_with(&mut mediator, &mut recipient).await;

        let update = KeylistUpdateMessage::new(vec![
            KeylistUpdate::add("key-a"),
            KeylistUpdate::add("key-a"),
            KeylistUpdate::remove("key-b"),
            KeylistUpdate::add("key-b"),
            KeylistUpdate::remove("key-b"),
        ]);
        let response = mediator
            .service
            .process_keylist_update_request(&mediator.inbound(update.clone()))
            .await
            .unwrap();

        let results: Vec<_> = response.updated.iter().map(|u| u.result).collect();
        assert_eq!(
            results,
            vec![
                KeylistUpdateResult::Success,
                KeylistUpdateResult::NoChange,
                KeylistUpdateResult::NoChange,
                KeylistUpdateResult::Success,
                KeylistUpdateResult::Success,
            ]
        );
        assert_eq!(response.thread_id(), update.id());

        let stored = mediator
            .service
            .get_by_id(&mediator.ctx, &mediator_record.id)
            .await
            .unwrap();
        assert_eq!(stored.recipient_keys, vec!["key-a".to_string()]);
        assert_eq!(
            mediator
                .service
                .find_by_recipient_key(&mediator.ctx, "key-a")
                .await
                .unwrap()
                .map(|r| r.id),
            Some(mediator_record.id)
        );
        assert!(mediator
            .service
            .find_by_recipient_key(&mediator.ctx, "key-b")
            .await
            .unwrap()
            .is_none());
        // Keylist changes are not state transitions
        assert!(mediator.transitions().is_empty());
    }

    #[tokio::test]
    async fn test_recipient_applies_successful_results() {
        let mut mediator = Party::mediator();
        let mut recipient = Party::recipient();
        let (_, recipient_record) = Party::granted_with(&mut mediator, &mut recipient).await;

        let response = KeylistUpdateResponseMessage::new(
            vec![
                KeylistUpdated {
                    recipient_key: "key-a".into(),
                    action: KeylistUpdateAction::Add,
                    result: KeylistUpdateResult::Success,
                },
                KeylistUpdated {
                    recipient_key: "key-b".into(),
                    action: KeylistUpdateAction::Add,
                    result: KeylistUpdateResult::ServerError,
                },
            ],
            "update-1",
        );
        let record = recipient
            .service
            .process_keylist_update_results(&recipient.inbound(response))
            .await
            .unwrap();
        assert_eq!(record.id, recipient_record.id);
        assert_eq!(record.recipient_keys, vec!["key-a".to_string()]);

        let events = recipient.events.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            MediationEvent::KeylistUpdated(event) => {
                assert_eq!(event.keylist.len(), 2);
                assert_eq!(event.mediation_record.recipient_keys, record.recipient_keys);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_keylist_update_message() {
        let mut mediator = Party::mediator();
        let mut recipient = Party::recipient();
        let (mediator_record, recipient_record) =
            Party::granted_with(&mut mediator, &mut recipient).await;

        let message = recipient
            .service
            .create_keylist_update_message(
                &recipient.ctx,
                &recipient_record,
                vec![KeylistUpdate::add("key-a")],
            )
            .await
            .unwrap();
        assert_eq!(message.updates, vec![KeylistUpdate::add("key-a")]);

        assert!(matches!(
            recipient
                .service
                .create_keylist_update_message(&recipient.ctx, &recipient_record, Vec::new())
                .await,
            Err(MediationError::Validation(_))
        ));
        assert!(matches!(
            recipient
                .service
                .create_keylist_update_message(
                    &recipient.ctx,
                    &mediator_record,
                    vec![KeylistUpdate::add("key-a")]
                )
                .await,
            Err(MediationError::InvalidRole { .. })
        ));
    }

    #[tokio::test]
    async fn test_default_mediator() {
        let recipient = Party::recipient();
        let other_connection = ConnectionRecord::new(DidExchangeState::Completed);

        let mut first = recipient
            .service
            .create_request(&recipient.ctx, &recipient.connection)
            .await
            .unwrap()
            .record;
        let mut second = recipient
            .service
            .create_request(&recipient.ctx, &other_connection)
            .await
            .unwrap()
            .record;

        assert!(recipient
            .service
            .find_default_mediator(&recipient.ctx)
            .await
            .unwrap()
            .is_none());

        recipient
            .service
            .set_default_mediator(&recipient.ctx, &mut first)
            .await
            .unwrap();
        recipient
            .service
            .set_default_mediator(&recipient.ctx, &mut second)
            .await
            .unwrap();

        let default = recipient
            .service
            .find_default_mediator(&recipient.ctx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(default.id, second.id);

        // Default mediator is still only requested
        let err = recipient
            .service
            .discover_mediation(&recipient.ctx, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not granted"));

        let explicit = recipient
            .service
            .discover_mediation(&recipient.ctx, Some(first.id.as_str()))
            .await
            .unwrap();
        assert_eq!(explicit.map(|r| r.id), Some(first.id.clone()));

        recipient
            .service
            .clear_default_mediator(&recipient.ctx)
            .await
            .unwrap();
        assert!(recipient
            .service
            .discover_mediation(&recipient.ctx, None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unready_connection_rejected() {
        let recipient = Party::recipient();
        let connection = ConnectionRecord::new(DidExchangeState::RequestSent);

        let err = recipient
            .service
            .create_request(&recipient.ctx, &connection)
            .await
            .unwrap_err();
        assert!(matches!(err, MediationError::Connection(_)));
    }
}
