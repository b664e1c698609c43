//! Ports for the Coordinate Mediation service

pub mod inbound;
pub mod outbound;

pub use inbound::{MediationApi, MessageAndRecord};
pub use outbound::{MediationEventPublisher, MediationStore};
