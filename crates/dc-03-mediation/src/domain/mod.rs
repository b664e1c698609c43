//! Domain layer for the Coordinate Mediation protocol

pub mod keylist;
pub mod record;
pub mod state;

pub use keylist::{KeylistUpdate, KeylistUpdateAction, KeylistUpdateResult, KeylistUpdated};
pub use record::{MediationRecord, MediatorRouting, DEFAULT_MEDIATOR_TAG};
pub use state::{MediationRole, MediationState};
