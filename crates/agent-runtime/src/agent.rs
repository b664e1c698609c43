//! # Agent
//!
//! One agent: storage, event bus, protocol services, handlers and module
//! APIs, wired from an [`AgentConfig`].
//!
//! ```text
//!            Delivery ──→ Agent::receive ──→ ProtocolRegistry::dispatch
//!                                                   │
//!   application ──→ modules ──→ services ←── handlers
//!                      │                         │
//!                      └────→ MessageSender ←────┘ (replies)
//! ```

use std::sync::Arc;

use dc_01_action_menu::{ActionMenuApi, ActionMenuHandler, ActionMenuService};
use dc_02_issue_credential::{
    CredentialHandler, CredentialService, CredentialsApi, JsonCredentialFormatService,
};
use dc_03_mediation::{MediationApi, MediationHandler, MediationService};
use shared_bus::{EventFilter, Subscription};
use shared_storage::{ExchangeLocks, InMemoryStorageService};
use shared_types::{AgentContext, ConnectionRecord, FeatureRegistry, InboundMessageContext};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::connections::ConnectionStore;
use crate::container::config::AgentConfig;
use crate::error::AgentResult;
use crate::events::AgentEvent;
use crate::handlers::MessageHandler;
use crate::modules::{ActionMenuModule, AgentBus, CredentialsModule, MediationModule, ModuleContext};
use crate::registry::ProtocolRegistry;
use crate::transport::{Delivery, MessageSender};

pub struct Agent {
    config: AgentConfig,
    storage: Arc<InMemoryStorageService>,
    features: Arc<FeatureRegistry>,
    registry: ProtocolRegistry,
    context: ModuleContext,
    action_menu: ActionMenuModule,
    credentials: CredentialsModule,
    mediation: MediationModule,
}

impl Agent {
    /// Build an agent for the default context.
    pub fn new(config: AgentConfig, sender: Arc<dyn MessageSender>) -> AgentResult<Self> {
        Self::with_context(config, sender, AgentContext::default())
    }

    /// Build an agent whose records and events are scoped to `agent_context`.
    pub fn with_context(
        config: AgentConfig,
        sender: Arc<dyn MessageSender>,
        agent_context: AgentContext,
    ) -> AgentResult<Self> {
        config.validate()?;

        let storage = Arc::new(InMemoryStorageService::new());
        let events = Arc::new(AgentBus::with_capacity(config.bus.channel_capacity));
        let context = ModuleContext {
            agent_context,
            connections: Arc::new(ConnectionStore::new()),
            sender,
            events: Arc::clone(&events),
            locks: ExchangeLocks::new(),
        };

        let action_menu_service: Arc<dyn ActionMenuApi> = Arc::new(ActionMenuService::new(
            Arc::clone(&storage),
            Arc::clone(&events),
        ));

        let credential_service: Arc<dyn CredentialsApi> = Arc::new(
            CredentialService::new(
                Arc::clone(&storage),
                Arc::clone(&events),
                Arc::new(JsonCredentialFormatService::new(
                    config.credentials.issuer_did.clone(),
                )),
            )
            .with_auto_accept(config.credentials.auto_accept_credentials),
        );

        let mut mediation_service = MediationService::new(Arc::clone(&storage), Arc::clone(&events));
        if let Some(routing) = config.mediator.routing() {
            mediation_service = mediation_service.with_routing(routing);
        }
        let mediation_service: Arc<dyn MediationApi> = Arc::new(mediation_service);

        let features = Arc::new(FeatureRegistry::new());
        let registry =
            ProtocolRegistry::with_locks(Arc::clone(&features), context.locks.clone());
        registry.register(Arc::new(ActionMenuHandler::new(Arc::clone(
            &action_menu_service,
        ))));
        registry.register(Arc::new(CredentialHandler::new(Arc::clone(
            &credential_service,
        ))));
        registry.register(Arc::new(
            MediationHandler::new(Arc::clone(&mediation_service))
                .with_auto_accept(config.mediator.auto_accept_mediation_requests),
        ));

        info!(
            label = %config.identity.label,
            context = %context.agent_context,
            protocols = ?registry.protocols(),
            "Agent initialized"
        );

        Ok(Self {
            action_menu: ActionMenuModule::new(action_menu_service, context.clone()),
            credentials: CredentialsModule::new(credential_service, context.clone()),
            mediation: MediationModule::new(mediation_service, context.clone()),
            config,
            storage,
            features,
            registry,
            context,
        })
    }

    pub fn label(&self) -> &str {
        &self.config.identity.label
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn agent_context(&self) -> &AgentContext {
        &self.context.agent_context
    }

    pub fn action_menu(&self) -> &ActionMenuModule {
        &self.action_menu
    }

    pub fn credentials(&self) -> &CredentialsModule {
        &self.credentials
    }

    pub fn mediation(&self) -> &MediationModule {
        &self.mediation
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn storage(&self) -> &InMemoryStorageService {
        &self.storage
    }

    pub fn connections(&self) -> &ConnectionStore {
        &self.context.connections
    }

    /// Replace the handler for a protocol major version.
    pub fn register_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.registry.register(handler);
    }

    /// Subscribe to agent events.
    pub fn subscribe(&self, filter: EventFilter) -> Subscription<AgentEvent> {
        self.context.events.subscribe(filter)
    }

    /// Process one delivered message and send the handler's reply, if any.
    pub async fn receive(&self, delivery: Delivery) -> AgentResult<()> {
        let mut inbound = InboundMessageContext::new(
            delivery.message,
            self.context.agent_context.clone(),
        )
        .with_keys(delivery.sender_key, delivery.recipient_key);

        if let Some(connection_id) = delivery.connection_id.as_deref() {
            match self.context.connections.find_by_id(connection_id) {
                Some(connection) => inbound = inbound.with_connection(connection),
                None => warn!(connection_id, "Inbound message on unknown connection"),
            }
        }

        if let Some(outbound) = self.registry.dispatch(inbound).await? {
            self.context.send(outbound).await?;
        }
        Ok(())
    }

    /// Process every delivery already queued in `inbox`. Returns how many
    /// were processed.
    pub async fn process_pending(&self, inbox: &mut mpsc::UnboundedReceiver<Delivery>) -> usize {
        let mut processed = 0;
        while let Ok(delivery) = inbox.try_recv() {
            self.receive_logged(delivery).await;
            processed += 1;
        }
        processed
    }

    /// Process deliveries until the inbox closes or shutdown is signalled.
    pub async fn run(
        self: Arc<Self>,
        mut inbox: mpsc::UnboundedReceiver<Delivery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(label = %self.label(), "Agent listening");
        loop {
            tokio::select! {
                delivery = inbox.recv() => match delivery {
                    Some(delivery) => self.receive_logged(delivery).await,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(label = %self.label(), "Agent stopped");
    }

    /// Handlers and the sender already log their failures.
    async fn receive_logged(&self, delivery: Delivery) {
        let message_id = delivery.message.id().to_string();
        if let Err(err) = self.receive(delivery).await {
            debug!(message_id = %message_id, error = %err, "Inbound message not processed");
        }
    }

    /// Store a connection established out of band.
    pub fn add_connection(&self, connection: ConnectionRecord) {
        self.context.connections.save(connection);
    }
}
