//! Inbound message handling for the Action Menu protocol

pub mod handler;

pub use handler::ActionMenuHandler;
