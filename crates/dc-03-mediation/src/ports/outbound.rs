//! Driven ports (SPI - Outbound)

use shared_bus::EventPublisher;
use shared_storage::StorageService;

use crate::events::MediationEvent;

/// Record store used by the mediation service.
pub trait MediationStore: StorageService {}

impl<T: StorageService + ?Sized> MediationStore for T {}

/// Event sink used by the mediation service.
pub trait MediationEventPublisher: EventPublisher<MediationEvent> {}

impl<T: EventPublisher<MediationEvent> + ?Sized> MediationEventPublisher for T {}
