//! In-process transport

use std::collections::HashMap;

use agent_telemetry::{metric_inc, OUTBOUND_MESSAGES};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{OutboundMessageContext, OutboundTarget};
use tokio::sync::mpsc;
use tracing::debug;

use super::{Delivery, MessageSender, TransportError, TransportResult};

#[derive(Debug, Clone)]
struct ConnectionRoute {
    endpoint: String,
    their_connection_id: String,
}

/// Delivers messages to agents registered in the same process.
///
/// Each agent registers its endpoint with an inbox. A connection is a pair
/// of ids, one per side; [`LoopbackTransport::connect`] records both
/// directions.
#[derive(Default)]
pub struct LoopbackTransport {
    inboxes: RwLock<HashMap<String, mpsc::UnboundedSender<Delivery>>>,
    connections: RwLock<HashMap<String, ConnectionRoute>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint. Returns the inbox the agent reads from.
    pub fn register_endpoint(&self, endpoint: impl Into<String>) -> mpsc::UnboundedReceiver<Delivery> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inboxes.write().insert(endpoint.into(), sender);
        receiver
    }

    /// Route `our_connection_id` to `their_endpoint`, and back.
    pub fn connect(
        &self,
        our_endpoint: &str,
        our_connection_id: &str,
        their_endpoint: &str,
        their_connection_id: &str,
    ) {
        let mut connections = self.connections.write();
        connections.insert(
            our_connection_id.to_string(),
            ConnectionRoute {
                endpoint: their_endpoint.to_string(),
                their_connection_id: their_connection_id.to_string(),
            },
        );
        connections.insert(
            their_connection_id.to_string(),
            ConnectionRoute {
                endpoint: our_endpoint.to_string(),
                their_connection_id: our_connection_id.to_string(),
            },
        );
    }

    fn deliver(&self, endpoint: &str, delivery: Delivery) -> TransportResult<()> {
        let inboxes = self.inboxes.read();
        let inbox = inboxes
            .get(endpoint)
            .ok_or_else(|| TransportError::UnknownEndpoint(endpoint.to_string()))?;
        inbox
            .send(delivery)
            .map_err(|_| TransportError::InboxClosed(endpoint.to_string()))
    }
}

#[async_trait]
impl MessageSender for LoopbackTransport {
    async fn send(&self, outbound: OutboundMessageContext) -> TransportResult<()> {
        let (endpoint, delivery) = match &outbound.target {
            OutboundTarget::Connection(connection) => {
                let route = self
                    .connections
                    .read()
                    .get(&connection.id)
                    .cloned()
                    .ok_or_else(|| TransportError::UnknownConnection(connection.id.clone()))?;
                let delivery = Delivery {
                    message: outbound.message.clone(),
                    connection_id: Some(route.their_connection_id),
                    sender_key: None,
                    recipient_key: None,
                };
                (route.endpoint, delivery)
            }
            OutboundTarget::Service {
                their_service,
                our_service,
            } => {
                let delivery = Delivery {
                    message: outbound.message.clone(),
                    connection_id: None,
                    sender_key: our_service.recipient_keys.first().cloned(),
                    recipient_key: their_service.recipient_keys.first().cloned(),
                };
                (their_service.service_endpoint.clone(), delivery)
            }
        };

        self.deliver(&endpoint, delivery)?;

        if let Ok(parsed) = outbound.message.parsed_type() {
            metric_inc!(
                OUTBOUND_MESSAGES,
                &[parsed.protocol_name.as_str(), parsed.message_name.as_str()]
            );
        }
        debug!(
            endpoint = %endpoint,
            message_type = %outbound.message.message_type(),
            "Delivered outbound message"
        );
        Ok(())
    }
}
