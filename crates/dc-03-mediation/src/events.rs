//! Mediation events

use shared_bus::{BusEvent, EventMetadata, EventTopic};
use shared_types::AgentContext;

use crate::domain::{KeylistUpdated, MediationRecord, MediationState};

#[derive(Debug, Clone, PartialEq)]
pub struct MediationStateChangedEvent {
    pub metadata: EventMetadata,
    pub mediation_record: MediationRecord,
    /// `None` when the record was just created.
    pub previous_state: Option<MediationState>,
}

/// Recipient side: the mediator confirmed a keylist update.
#[derive(Debug, Clone, PartialEq)]
pub struct KeylistUpdatedEvent {
    pub metadata: EventMetadata,
    pub mediation_record: MediationRecord,
    pub keylist: Vec<KeylistUpdated>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediationEvent {
    StateChanged(MediationStateChangedEvent),
    KeylistUpdated(KeylistUpdatedEvent),
}

impl MediationEvent {
    pub fn state_changed(
        ctx: &AgentContext,
        record: &MediationRecord,
        previous_state: Option<MediationState>,
    ) -> Self {
        Self::StateChanged(MediationStateChangedEvent {
            metadata: EventMetadata::from(ctx),
            mediation_record: record.clone(),
            previous_state,
        })
    }

    pub fn keylist_updated(
        ctx: &AgentContext,
        record: &MediationRecord,
        keylist: Vec<KeylistUpdated>,
    ) -> Self {
        Self::KeylistUpdated(KeylistUpdatedEvent {
            metadata: EventMetadata::from(ctx),
            mediation_record: record.clone(),
            keylist,
        })
    }

    pub fn mediation_record(&self) -> &MediationRecord {
        match self {
            Self::StateChanged(event) => &event.mediation_record,
            Self::KeylistUpdated(event) => &event.mediation_record,
        }
    }
}

impl BusEvent for MediationEvent {
    fn topic(&self) -> EventTopic {
        EventTopic::Mediation
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "MediationStateChanged",
            Self::KeylistUpdated(_) => "RecipientKeylistUpdated",
        }
    }

    fn metadata(&self) -> &EventMetadata {
        match self {
            Self::StateChanged(event) => &event.metadata,
            Self::KeylistUpdated(event) => &event.metadata,
        }
    }
}
