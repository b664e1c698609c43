//! # Agent Runtime
//!
//! Wires the protocol crates into a running DIDComm agent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Agent                                │
//! │                                                                  │
//! │  AgentConfig ──→ services ──→ handlers ──→ ProtocolRegistry      │
//! │                     │                            ↑               │
//! │                     ↓                            │               │
//! │           InMemoryStorageService        Agent::receive(Delivery) │
//! │           InMemoryEventBus<AgentEvent>                           │
//! │                                                                  │
//! │  modules (action menu, credentials, mediation) ──→ MessageSender │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocols
//!
//! | Protocol | Crate | Roles |
//! |----------|-------|-------|
//! | `action-menu/1.0` | `dc-01-action-menu` | requester, responder |
//! | `issue-credential/1.0` | `dc-02-issue-credential` | holder, issuer |
//! | `coordinate-mediation/1.0` | `dc-03-mediation` | mediator, recipient |
//!
//! ## Concurrency
//!
//! Each inbound message is processed on its own task. The registry holds an
//! [`shared_storage::ExchangeLocks`] entry per connection (per thread for
//! connection-less messages) while the handler runs. Module calls that change
//! a record take the same entry through [`modules::ModuleContext`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod agent;
pub mod connections;
pub mod container;
pub mod error;
pub mod events;
pub mod handlers;
pub mod modules;
pub mod registry;
pub mod transport;

pub use agent::Agent;
pub use connections::ConnectionStore;
pub use container::{AgentConfig, ConfigError};
pub use error::{AgentError, AgentResult, DispatchError, DispatchResult};
pub use events::{AgentEvent, MessageDroppedEvent};
pub use handlers::MessageHandler;
pub use modules::{ActionMenuModule, AgentBus, CredentialsModule, MediationModule};
pub use registry::ProtocolRegistry;
pub use transport::{Delivery, LoopbackTransport, MessageSender, TransportError};
