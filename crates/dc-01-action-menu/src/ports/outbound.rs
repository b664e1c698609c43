//! Driven ports (SPI - Outbound)
//!
//! The service persists records through any [`StorageService`] and publishes
//! through any bus that accepts [`ActionMenuEvent`]s.

use shared_bus::EventPublisher;
use shared_storage::StorageService;

use crate::events::ActionMenuEvent;

/// Record store used by the action menu service.
pub trait ActionMenuStore: StorageService {}

impl<T: StorageService + ?Sized> ActionMenuStore for T {}

/// Event sink used by the action menu service.
pub trait ActionMenuEventPublisher: EventPublisher<ActionMenuEvent> {}

impl<T: EventPublisher<ActionMenuEvent> + ?Sized> ActionMenuEventPublisher for T {}
