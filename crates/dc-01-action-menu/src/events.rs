//! Action menu events
//!
//! Exactly one [`ActionMenuEvent::StateChanged`] is published per state
//! transition. The record is a snapshot taken after the transition.

use shared_bus::{BusEvent, EventMetadata, EventTopic};
use shared_types::AgentContext;

use crate::domain::{ActionMenuRecord, ActionMenuState};

/// Payload of a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMenuStateChangedEvent {
    pub metadata: EventMetadata,
    pub action_menu_record: ActionMenuRecord,
    /// `None` when the record was just created.
    pub previous_state: Option<ActionMenuState>,
}

/// Events published by the action menu service.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionMenuEvent {
    StateChanged(ActionMenuStateChangedEvent),
}

impl ActionMenuEvent {
    pub fn state_changed(
        ctx: &AgentContext,
        record: &ActionMenuRecord,
        previous_state: Option<ActionMenuState>,
    ) -> Self {
        Self::StateChanged(ActionMenuStateChangedEvent {
            metadata: EventMetadata::from(ctx),
            action_menu_record: record.clone(),
            previous_state,
        })
    }
}

impl BusEvent for ActionMenuEvent {
    fn topic(&self) -> EventTopic {
        EventTopic::ActionMenu
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "ActionMenuStateChanged",
        }
    }

    fn metadata(&self) -> &EventMetadata {
        match self {
            Self::StateChanged(event) => &event.metadata,
        }
    }
}
