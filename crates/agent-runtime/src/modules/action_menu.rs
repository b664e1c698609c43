//! Action menu module API

use std::sync::Arc;

use dc_01_action_menu::{
    ActionMenu, ActionMenuApi, ActionMenuError, ActionMenuRecord, ActionMenuRole,
    ActionMenuSelection, ClearMenuOptions, CreateMenuOptions, CreatePerformOptions,
    CreateRequestOptions, FindMenuOptions,
};

use super::ModuleContext;
use crate::error::AgentResult;

pub struct ActionMenuModule {
    service: Arc<dyn ActionMenuApi>,
    context: ModuleContext,
}

impl ActionMenuModule {
    pub fn new(service: Arc<dyn ActionMenuApi>, context: ModuleContext) -> Self {
        Self { service, context }
    }

    /// Requester asks the peer for its root menu.
    pub async fn request_menu(&self, connection_id: &str) -> AgentResult<ActionMenuRecord> {
        let connection = self.context.ready_connection(connection_id)?;
        let _guard = self.context.lock_connection(connection_id).await;
        let created = self
            .service
            .create_request(
                &self.context.agent_context,
                CreateRequestOptions {
                    connection: connection.clone(),
                },
            )
            .await?;

        self.context
            .send_to_connection(&created.message, connection, Some(created.record.id.clone()))
            .await?;
        Ok(created.record)
    }

    /// Responder sends a menu, answering a request or unsolicited.
    pub async fn send_menu(
        &self,
        connection_id: &str,
        menu: ActionMenu,
    ) -> AgentResult<ActionMenuRecord> {
        let connection = self.context.ready_connection(connection_id)?;
        let _guard = self.context.lock_connection(connection_id).await;
        let created = self
            .service
            .create_menu(
                &self.context.agent_context,
                CreateMenuOptions {
                    connection: connection.clone(),
                    menu,
                },
            )
            .await?;

        self.context
            .send_to_connection(&created.message, connection, Some(created.record.id.clone()))
            .await?;
        Ok(created.record)
    }

    /// Requester performs an option of the menu it received.
    pub async fn perform_action(
        &self,
        connection_id: &str,
        performed_action: ActionMenuSelection,
    ) -> AgentResult<ActionMenuRecord> {
        let connection = self.context.ready_connection(connection_id)?;
        let _guard = self.context.lock_connection(connection_id).await;
        let record = self
            .find_active_menu(connection_id, ActionMenuRole::Requester)
            .await?
            .ok_or_else(|| {
                ActionMenuError::NotFound(format!(
                    "No active menu found for connection id {connection_id}"
                ))
            })?;

        let created = self
            .service
            .create_perform(
                &self.context.agent_context,
                CreatePerformOptions {
                    action_menu_record: record,
                    performed_action,
                },
            )
            .await?;

        self.context
            .send_to_connection(&created.message, connection, Some(created.record.id.clone()))
            .await?;
        Ok(created.record)
    }

    /// Abandon the current menu for `role`. Nothing is sent to the peer.
    pub async fn clear_active_menu(
        &self,
        connection_id: &str,
        role: ActionMenuRole,
    ) -> AgentResult<Option<ActionMenuRecord>> {
        let _guard = self.context.lock_connection(connection_id).await;
        let Some(record) = self.find_active_menu(connection_id, role).await? else {
            return Ok(None);
        };
        let cleared = self
            .service
            .clear_menu(
                &self.context.agent_context,
                ClearMenuOptions {
                    action_menu_record: record,
                },
            )
            .await?;
        Ok(Some(cleared))
    }

    /// Current record for `role`. Takes no lock.
    pub async fn find_active_menu(
        &self,
        connection_id: &str,
        role: ActionMenuRole,
    ) -> AgentResult<Option<ActionMenuRecord>> {
        let options = FindMenuOptions {
            connection_id: connection_id.to_string(),
            role,
            thread_id: None,
        };
        Ok(self
            .service
            .find(&self.context.agent_context, &options)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::events::AgentEvent;
    use crate::modules::testing::{module_context, RecordingSender};
    use crate::registry::connection_key;
    use async_trait::async_trait;
    use dc_01_action_menu::{ActionMenuEvent, ActionMenuOption, ActionMenuService, ActionMenuState};
    use shared_bus::{EventFilter, EventTopic, Subscription};
    use shared_storage::{
        InMemoryStorageService, Query, QueryOptions, StorageResult, StorageService, StoredRecord,
    };
    use shared_types::{AgentContext, ConnectionRecord, DidExchangeState};
    use std::time::Duration;

    // Yields before every read so concurrent calls interleave
    #[derive(Default)]
    struct YieldingStorage(InMemoryStorageService);

    #[async_trait]
    impl StorageService for YieldingStorage {
        async fn save(
            &self,
            ctx: &AgentContext,
            record_type: &str,
            record: StoredRecord,
        ) -> StorageResult<()> {
            self.0.save(ctx, record_type, record).await
        }

        async fn update(
            &self,
            ctx: &AgentContext,
            record_type: &str,
            record: StoredRecord,
        ) -> StorageResult<()> {
            self.0.update(ctx, record_type, record).await
        }

        async fn delete(
            &self,
            ctx: &AgentContext,
            record_type: &str,
            id: &str,
        ) -> StorageResult<()> {
            self.0.delete(ctx, record_type, id).await
        }

        async fn get(
            &self,
            ctx: &AgentContext,
            record_type: &str,
            id: &str,
        ) -> StorageResult<Option<StoredRecord>> {
            tokio::task::yield_now().await;
            self.0.get(ctx, record_type, id).await
        }

        async fn find(
            &self,
            ctx: &AgentContext,
            record_type: &str,
            query: &Query,
            options: QueryOptions,
        ) -> StorageResult<Vec<StoredRecord>> {
            tokio::task::yield_now().await;
            let found = self.0.find(ctx, record_type, query, options).await;
            tokio::task::yield_now().await;
            found
        }
    }

    fn module_over<S: StorageService + 'static>(
        storage: S,
        sender: Arc<RecordingSender>,
    ) -> (ActionMenuModule, ConnectionRecord) {
        let (context, connection) = module_context(sender);
        let service = ActionMenuService::new(Arc::new(storage), Arc::clone(&context.events));
        (ActionMenuModule::new(Arc::new(service), context), connection)
    }

    fn module(sender: Arc<RecordingSender>) -> (ActionMenuModule, ConnectionRecord) {
        module_over(InMemoryStorageService::new(), sender)
    }

    fn transitions(
        events: &mut Subscription<AgentEvent>,
    ) -> Vec<(Option<ActionMenuState>, ActionMenuState)> {
        events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                AgentEvent::ActionMenu(ActionMenuEvent::StateChanged(changed)) => {
                    Some((changed.previous_state, changed.action_menu_record.state))
                }
                _ => None,
            })
            .collect()
    }

    fn menu() -> ActionMenu {
        ActionMenu::new(
            "Welcome",
            "Choose an option",
            vec![ActionMenuOption::new("balance", "Balance", "Show balance")],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_request_menu_sends_request() {
        let sender = Arc::new(RecordingSender::default());
        let (module, connection) = module(Arc::clone(&sender));

        let record = module.request_menu(&connection.id).await.unwrap();

        assert_eq!(record.state, ActionMenuState::AwaitingRootMenu);
        assert_eq!(record.role, ActionMenuRole::Requester);
        assert_eq!(
            sender.sent_types(),
            vec!["https://didcomm.org/action-menu/1.0/menu-request"]
        );
        let sent = sender.sent.lock();
        assert_eq!(sent[0].connection_id(), Some(connection.id.as_str()));
        assert_eq!(sent[0].associated_record_id.as_deref(), Some(record.id.as_str()));
    }

    #[tokio::test]
    async fn test_send_menu_and_clear() {
        let sender = Arc::new(RecordingSender::default());
        let (module, connection) = module(Arc::clone(&sender));

        let record = module.send_menu(&connection.id, menu()).await.unwrap();
        assert_eq!(record.state, ActionMenuState::AwaitingSelection);
        assert_eq!(sender.sent_types(), vec!["https://didcomm.org/action-menu/1.0/menu"]);

        let cleared = module
            .clear_active_menu(&connection.id, ActionMenuRole::Responder)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.state, ActionMenuState::Null);
        assert!(cleared.menu.is_none());
        assert_eq!(sender.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_without_menu_is_none() {
        let (module, connection) = module(Arc::new(RecordingSender::default()));
        let cleared = module
            .clear_active_menu(&connection.id, ActionMenuRole::Requester)
            .await
            .unwrap();
        assert!(cleared.is_none());
    }

    #[tokio::test]
    async fn test_perform_without_menu_fails() {
        let sender = Arc::new(RecordingSender::default());
        let (module, connection) = module(Arc::clone(&sender));

        let err = module
            .perform_action(&connection.id, ActionMenuSelection::new("balance"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::ActionMenu(ActionMenuError::NotFound(ref msg))
                if msg == &format!("No active menu found for connection id {}", connection.id)
        ));
        assert!(sender.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_unready_connection() {
        let (module, _) = module(Arc::new(RecordingSender::default()));
        let err = module.request_menu("missing").await.unwrap_err();
        assert!(matches!(err, AgentError::ConnectionNotFound(_)));

        let pending = ConnectionRecord::new(DidExchangeState::RequestSent);
        module.context.connections.save(pending.clone());
        let err = module.request_menu(&pending.id).await.unwrap_err();
        assert!(matches!(err, AgentError::Connection(_)));
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_record() {
        let sender = Arc::new(RecordingSender {
            offline: true,
            ..Default::default()
        });
        let (module, connection) = module(sender);
        let mut dropped = module
            .context
            .events
            .subscribe(shared_bus::EventFilter::topics(vec![shared_bus::EventTopic::Agent]));

        let err = module.request_menu(&connection.id).await.unwrap_err();
        assert!(matches!(err, AgentError::Transport(_)));

        let record = module
            .find_active_menu(&connection.id, ActionMenuRole::Requester)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.state, ActionMenuState::AwaitingRootMenu);
        assert_eq!(dropped.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_send_menu_waits_for_exchange_on_connection() {
        let sender = Arc::new(RecordingSender::default());
        let (module, connection) = module(Arc::clone(&sender));
        let module = Arc::new(module);

        // Held the way the registry holds it while a message is handled
        let guard = module
            .context
            .locks
            .lock(&connection_key(&connection.id))
            .await;
        let task = {
            let module = Arc::clone(&module);
            let connection_id = connection.id.clone();
            tokio::spawn(async move { module.send_menu(&connection_id, menu()).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!task.is_finished());
        assert!(sender.sent.lock().is_empty());
        assert!(module
            .find_active_menu(&connection.id, ActionMenuRole::Responder)
            .await
            .unwrap()
            .is_none());

        drop(guard);
        let record = task.await.unwrap().unwrap();
        assert_eq!(record.state, ActionMenuState::AwaitingSelection);
        assert_eq!(sender.sent.lock().len(), 1);
        assert_eq!(module.context.locks.active_keys(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_menus_on_one_connection_share_a_record() {
        let sender = Arc::new(RecordingSender::default());
        let (module, connection) = module_over(YieldingStorage::default(), Arc::clone(&sender));
        let module = Arc::new(module);
        let mut events = module
            .context
            .events
            .subscribe(EventFilter::topics(vec![EventTopic::ActionMenu]));

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let module = Arc::clone(&module);
                let connection_id = connection.id.clone();
                tokio::spawn(async move { module.send_menu(&connection_id, menu()).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // The second call finds and resets the first call's record
        assert_eq!(
            transitions(&mut events),
            vec![
                (None, ActionMenuState::AwaitingSelection),
                (
                    Some(ActionMenuState::AwaitingSelection),
                    ActionMenuState::AwaitingSelection
                ),
            ]
        );
        assert_eq!(sender.sent.lock().len(), 2);
    }
}
