//! # Message Transport
//!
//! The [`MessageSender`] port takes an [`OutboundMessageContext`] and gets it
//! to the peer. Packing, encryption and real network transports are outside
//! this workspace; [`LoopbackTransport`] delivers between agents living in the
//! same process.

mod loopback;

pub use loopback::LoopbackTransport;

use async_trait::async_trait;
use shared_types::{OutboundMessageContext, PlaintextMessage};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No route registered for connection {0}")]
    UnknownConnection(String),

    #[error("No agent listening on endpoint {0}")]
    UnknownEndpoint(String),

    #[error("Inbox for endpoint {0} is closed")]
    InboxClosed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// A message as it arrives at the receiving agent.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: PlaintextMessage,
    /// The receiver's connection the message came over.
    pub connection_id: Option<String>,
    pub sender_key: Option<String>,
    pub recipient_key: Option<String>,
}

/// Outbound port.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, outbound: OutboundMessageContext) -> TransportResult<()>;
}
