//! # Protocol Registry
//!
//! Routes inbound plaintext messages to the handler owning their protocol.
//!
//! ```text
//! InboundMessageContext<PlaintextMessage>
//!        │  parse @type → "<protocol>/<major>"
//!        ↓
//!   handler lookup ──(none)──→ DispatchError::UnsupportedProtocol
//!        │
//!   ExchangeLocks::lock(connection id | thread id)
//!        ↓
//!   handler.handle() ──→ Option<OutboundMessageContext>
//! ```
//!
//! Handlers for the same exchange key run one at a time, so a record read,
//! modified and written back by one message is never overwritten by a
//! concurrent message on the same connection. Module calls take the same
//! keys through the shared [`ExchangeLocks`].

use std::collections::HashMap;
use std::sync::Arc;

use agent_telemetry::{metric_inc, HANDLER_ERRORS, INBOUND_MESSAGES};
use parking_lot::RwLock;
use shared_storage::ExchangeLocks;
use shared_types::{
    FeatureRegistry, InboundMessageContext, OutboundMessageContext, PlaintextMessage,
};
use tracing::{debug, info, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::handlers::MessageHandler;

/// Protocol name and major version, e.g. `action-menu/1`.
fn handler_key(protocol_name: &str, version: &str) -> String {
    let major = version.split('.').next().unwrap_or(version);
    format!("{protocol_name}/{major}")
}

/// Exchange key for everything happening on a connection.
pub fn connection_key(connection_id: &str) -> String {
    format!("connection:{connection_id}")
}

/// Exchange key for a connection-less thread.
pub fn thread_key(thread_id: &str) -> String {
    format!("thread:{thread_id}")
}

/// Serialization key for an inbound message.
fn exchange_key(inbound: &InboundMessageContext<PlaintextMessage>) -> String {
    match &inbound.connection {
        Some(connection) => connection_key(&connection.id),
        None => thread_key(inbound.message.thread_id()),
    }
}

/// Protocol dispatcher.
pub struct ProtocolRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
    features: Arc<FeatureRegistry>,
    locks: ExchangeLocks,
}

impl ProtocolRegistry {
    pub fn new(features: Arc<FeatureRegistry>) -> Self {
        Self::with_locks(features, ExchangeLocks::new())
    }

    /// Dispatcher sharing `locks` with application-initiated calls.
    pub fn with_locks(features: Arc<FeatureRegistry>, locks: ExchangeLocks) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            features,
            locks,
        }
    }

    /// Register a handler and advertise its protocol.
    ///
    /// A later registration for the same protocol major version replaces the
    /// earlier one.
    pub fn register(&self, handler: Arc<dyn MessageHandler>) {
        let key = handler_key(handler.protocol_name(), handler.protocol_version());
        self.features.register(handler.feature());
        info!(protocol = %key, "Registered protocol handler");
        self.handlers.write().insert(key, handler);
    }

    /// Whether a handler is registered for the protocol major version.
    pub fn supports(&self, protocol_name: &str, version: &str) -> bool {
        self.handlers
            .read()
            .contains_key(&handler_key(protocol_name, version))
    }

    /// Registered `<protocol>/<major>` keys.
    pub fn protocols(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.handlers.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Exchange keys currently being processed or waited on.
    pub fn active_exchanges(&self) -> usize {
        self.locks.active_keys()
    }

    /// Route one inbound message.
    pub async fn dispatch(
        &self,
        inbound: InboundMessageContext<PlaintextMessage>,
    ) -> DispatchResult<Option<OutboundMessageContext>> {
        let parsed = inbound.message.parsed_type()?;
        let key = handler_key(&parsed.protocol_name, &parsed.major_version);
        let Some(handler) = self.handlers.read().get(&key).cloned() else {
            warn!(
                message_type = %inbound.message.message_type(),
                "No handler registered for inbound message"
            );
            return Err(DispatchError::UnsupportedProtocol(parsed.protocol_uri()));
        };

        metric_inc!(
            INBOUND_MESSAGES,
            &[parsed.protocol_name.as_str(), parsed.message_name.as_str()]
        );

        let _guard = self.locks.lock(&exchange_key(&inbound)).await;
        debug!(
            protocol = %key,
            message = %parsed.message_name,
            id = %inbound.message.id(),
            "Dispatching inbound message"
        );

        let result = handler.handle(inbound).await;
        if let Err(err) = &result {
            metric_inc!(HANDLER_ERRORS, &[parsed.protocol_name.as_str(), err.kind()]);
        }
        result
    }
}
