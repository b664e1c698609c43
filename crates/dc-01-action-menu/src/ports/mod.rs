//! Ports for the Action Menu service

pub mod inbound;
pub mod outbound;

pub use inbound::{
    ActionMenuApi, ClearMenuOptions, CreateMenuOptions, CreatePerformOptions,
    CreateRequestOptions, FindMenuOptions, MessageAndRecord,
};
pub use outbound::{ActionMenuEventPublisher, ActionMenuStore};
