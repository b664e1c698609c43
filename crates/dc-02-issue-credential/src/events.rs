//! Credential exchange events

use shared_bus::{BusEvent, EventMetadata, EventTopic};
use shared_types::AgentContext;

use crate::domain::{CredentialExchangeRecord, CredentialState};

#[derive(Debug, Clone, PartialEq)]
pub struct CredentialStateChangedEvent {
    pub metadata: EventMetadata,
    pub credential_record: CredentialExchangeRecord,
    /// `None` when the record was just created.
    pub previous_state: Option<CredentialState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CredentialEvent {
    StateChanged(CredentialStateChangedEvent),
}

impl CredentialEvent {
    pub fn state_changed(
        ctx: &AgentContext,
        record: &CredentialExchangeRecord,
        previous_state: Option<CredentialState>,
    ) -> Self {
        Self::StateChanged(CredentialStateChangedEvent {
            metadata: EventMetadata::from(ctx),
            credential_record: record.clone(),
            previous_state,
        })
    }
}

impl BusEvent for CredentialEvent {
    fn topic(&self) -> EventTopic {
        EventTopic::IssueCredential
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "CredentialStateChanged",
        }
    }

    fn metadata(&self) -> &EventMetadata {
        match self {
            Self::StateChanged(event) => &event.metadata,
        }
    }
}
