//! # Message Contexts
//!
//! ```text
//!  transport ──→ InboundMessageContext<PlaintextMessage>
//!                     │  (dispatcher parses @type)
//!                     ↓
//!               InboundMessageContext<TypedMessage> ──→ service.process_*()
//!                                                          │
//!               OutboundMessageContext  ←── handler ←──────┘
//!                     │
//!                     ↓
//!               message sender (connection or service endpoint)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::connection::ConnectionRecord;
use crate::decorators::ServiceDecorator;
use crate::errors::{ConnectionError, MessageError};
use crate::message::{AgentMessage, PlaintextMessage};

/// Identifies the logical agent (tenant) an operation runs for.
///
/// Storage and events are scoped by `context_correlation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub context_correlation_id: String,
}

impl AgentContext {
    /// Context id used when an agent runs without tenants.
    pub const DEFAULT_CONTEXT_ID: &'static str = "default";

    /// Context for the given correlation id.
    pub fn new(context_correlation_id: impl Into<String>) -> Self {
        Self {
            context_correlation_id: context_correlation_id.into(),
        }
    }
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CONTEXT_ID)
    }
}

impl fmt::Display for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.context_correlation_id)
    }
}

/// An inbound message together with where it came from.
#[derive(Debug, Clone)]
pub struct InboundMessageContext<M> {
    pub message: M,
    pub agent_context: AgentContext,
    pub connection: Option<ConnectionRecord>,
    /// Key the envelope was packed with, if authcrypted.
    pub sender_key: Option<String>,
    /// Our key the envelope was packed for.
    pub recipient_key: Option<String>,
}

impl<M> InboundMessageContext<M> {
    pub fn new(message: M, agent_context: AgentContext) -> Self {
        Self {
            message,
            agent_context,
            connection: None,
            sender_key: None,
            recipient_key: None,
        }
    }

    pub fn with_connection(mut self, connection: ConnectionRecord) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn with_keys(mut self, sender_key: Option<String>, recipient_key: Option<String>) -> Self {
        self.sender_key = sender_key;
        self.recipient_key = recipient_key;
        self
    }

    /// Swap the message, keeping the routing context.
    pub fn with_message<N>(self, message: N) -> InboundMessageContext<N> {
        InboundMessageContext {
            message,
            agent_context: self.agent_context,
            connection: self.connection,
            sender_key: self.sender_key,
            recipient_key: self.recipient_key,
        }
    }
}

impl<M: AgentMessage> InboundMessageContext<M> {
    /// The connection, which must exist and be ready.
    pub fn assert_ready_connection(&self) -> Result<&ConnectionRecord, ConnectionError> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| ConnectionError::NoConnection {
                message_type: M::TYPE.uri(),
            })?;
        connection.assert_ready()?;
        Ok(connection)
    }

    /// Accept the message over a ready connection, or connection-less when it
    /// carries `~service` and its keys match the service decorators exchanged
    /// earlier in the thread.
    pub fn assert_connection_or_service(
        &self,
        previous_received: Option<&ServiceDecorator>,
        previous_sent: Option<&ServiceDecorator>,
    ) -> Result<(), ConnectionError> {
        if let Some(connection) = &self.connection {
            return connection.assert_ready();
        }

        if self.message.service().is_none() {
            return Err(ConnectionError::NoConnectionOrService {
                message_type: M::TYPE.uri(),
            });
        }

        if let (Some(sent), Some(key)) = (previous_sent, &self.recipient_key) {
            if !sent.recipient_keys.contains(key) {
                return Err(ConnectionError::RecipientKeyMismatch { key: key.clone() });
            }
        }
        if let (Some(received), Some(key)) = (previous_received, &self.sender_key) {
            if !received.recipient_keys.contains(key) {
                return Err(ConnectionError::SenderKeyMismatch { key: key.clone() });
            }
        }
        Ok(())
    }
}

impl InboundMessageContext<PlaintextMessage> {
    /// Parse the plaintext into a typed message, keeping the routing context.
    pub fn into_typed<M: AgentMessage>(self) -> Result<InboundMessageContext<M>, MessageError> {
        let message = self.message.to_typed::<M>()?;
        Ok(self.with_message(message))
    }
}

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundTarget {
    /// Over an established connection.
    Connection(ConnectionRecord),
    /// Connection-less, to the peer's declared service.
    Service {
        their_service: ServiceDecorator,
        our_service: ServiceDecorator,
    },
}

/// A message ready to be handed to the message sender.
#[derive(Debug, Clone)]
pub struct OutboundMessageContext {
    pub message: PlaintextMessage,
    pub agent_context: AgentContext,
    pub associated_record_id: Option<String>,
    pub target: OutboundTarget,
}

impl OutboundMessageContext {
    /// Message over a connection.
    pub fn for_connection<M: AgentMessage>(
        message: &M,
        agent_context: &AgentContext,
        connection: ConnectionRecord,
        associated_record_id: Option<String>,
    ) -> Result<Self, MessageError> {
        Ok(Self {
            message: message.to_plaintext()?,
            agent_context: agent_context.clone(),
            associated_record_id,
            target: OutboundTarget::Connection(connection),
        })
    }

    /// Connection-less message. Our service is attached as `~service` so the
    /// peer can answer.
    pub fn for_service<M: AgentMessage>(
        message: &M,
        agent_context: &AgentContext,
        their_service: ServiceDecorator,
        our_service: ServiceDecorator,
        associated_record_id: Option<String>,
    ) -> Result<Self, MessageError> {
        let mut message = message.clone();
        message.set_service(Some(our_service.clone()));
        Ok(Self {
            message: message.to_plaintext()?,
            agent_context: agent_context.clone(),
            associated_record_id,
            target: OutboundTarget::Service {
                their_service,
                our_service,
            },
        })
    }

    /// Connection id, when sent over a connection.
    pub fn connection_id(&self) -> Option<&str> {
        match &self.target {
            OutboundTarget::Connection(connection) => Some(&connection.id),
            OutboundTarget::Service { .. } => None,
        }
    }
}
