//! IPC layer for coordinate mediation

pub mod handler;

pub use handler::MediationHandler;
