//! # Module APIs
//!
//! Application-facing calls. Each one runs a `create_*` on the protocol
//! service and hands the resulting message to the message sender.
//!
//! Calls that change a record hold the exchange lock of its connection, the
//! same one the registry holds while an inbound message on that connection
//! is handled.

mod action_menu;
mod credentials;
mod mediation;

pub use action_menu::ActionMenuModule;
pub use credentials::CredentialsModule;
pub use mediation::MediationModule;

use std::sync::Arc;

use agent_telemetry::{metric_inc, OUTBOUND_DROPPED};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_storage::{ExchangeGuard, ExchangeLocks};
use shared_types::{AgentContext, AgentMessage, ConnectionRecord, OutboundMessageContext};
use tracing::error;

use crate::connections::ConnectionStore;
use crate::error::AgentResult;
use crate::events::AgentEvent;
use crate::registry::{connection_key, thread_key};
use crate::transport::MessageSender;

/// The agent-wide event bus.
pub type AgentBus = InMemoryEventBus<AgentEvent>;

/// What every module needs to reach peers.
#[derive(Clone)]
pub struct ModuleContext {
    pub agent_context: AgentContext,
    pub connections: Arc<ConnectionStore>,
    pub sender: Arc<dyn MessageSender>,
    pub events: Arc<AgentBus>,
    /// Shared with the protocol registry.
    pub locks: ExchangeLocks,
}

impl ModuleContext {
    /// Wait until no inbound message or other call is working on the
    /// connection.
    pub async fn lock_connection(&self, connection_id: &str) -> ExchangeGuard {
        self.locks.lock(&connection_key(connection_id)).await
    }

    /// Lock for a record that may have no connection.
    pub async fn lock_exchange(
        &self,
        connection_id: Option<&str>,
        thread_id: &str,
    ) -> ExchangeGuard {
        match connection_id {
            Some(connection_id) => self.lock_connection(connection_id).await,
            None => self.locks.lock(&thread_key(thread_id)).await,
        }
    }

    /// Connection that exists and has completed DID exchange.
    pub fn ready_connection(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        let connection = self.connections.get_by_id(connection_id)?;
        connection.assert_ready()?;
        Ok(connection)
    }

    /// Wrap `message` for `connection` and send it.
    pub async fn send_to_connection<M: AgentMessage>(
        &self,
        message: &M,
        connection: ConnectionRecord,
        associated_record_id: Option<String>,
    ) -> AgentResult<()> {
        let outbound = OutboundMessageContext::for_connection(
            message,
            &self.agent_context,
            connection,
            associated_record_id,
        )?;
        self.send(outbound).await
    }

    /// Hand a message to the sender. Failed deliveries are counted and
    /// published as [`AgentEvent::MessageDropped`] before the error returns.
    pub async fn send(&self, outbound: OutboundMessageContext) -> AgentResult<()> {
        let message_id = outbound.message.id().to_string();
        let message_type = outbound.message.message_type().to_string();
        let agent_context = outbound.agent_context.clone();

        if let Err(err) = self.sender.send(outbound).await {
            metric_inc!(OUTBOUND_DROPPED);
            error!(
                message_id = %message_id,
                message_type = %message_type,
                error = %err,
                "Outbound message could not be delivered"
            );
            self.events
                .publish(AgentEvent::message_dropped(
                    &agent_context,
                    message_id,
                    message_type,
                    err.to_string(),
                ))
                .await;
            return Err(err.into());
        }
        Ok(())
    }
}
