//! # Shared Types Crate
//!
//! Message model, decorators and routing contexts shared by every protocol
//! crate of the agent.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the DIDComm header and decorator types are
//!   defined once here; protocol crates only define their message bodies.
//! - **Typed at the edge**: inbound messages arrive as [`PlaintextMessage`] and
//!   are parsed into typed [`AgentMessage`]s by the protocol handler that owns
//!   the `@type`.
//! - **References, not ownership**: exchanges refer to a [`ConnectionRecord`]
//!   by id; connection lifecycle lives elsewhere.

pub mod connection;
pub mod context;
pub mod decorators;
pub mod errors;
pub mod features;
pub mod message;
pub mod problem_report;

pub use connection::{ConnectionRecord, DidExchangeState};
pub use context::{AgentContext, InboundMessageContext, OutboundMessageContext, OutboundTarget};
pub use decorators::{
    Attachment, AttachmentData, PleaseAckDecorator, ServiceDecorator, ThreadDecorator,
};
pub use errors::{ConnectionError, MessageError};
pub use features::{FeatureRegistry, Protocol};
pub use message::{
    generate_id, AgentMessage, MessageHeader, MessageType, ParsedMessageType, PlaintextMessage,
};
pub use problem_report::{ProblemReportBody, ProblemReportDescription, WhoRetries};
