//! Agent-wide event type
//!
//! Protocol services publish their own event enums; the agent bus carries
//! [`AgentEvent`], which every protocol event converts into.

use dc_01_action_menu::ActionMenuEvent;
use dc_02_issue_credential::CredentialEvent;
use dc_03_mediation::MediationEvent;
use shared_bus::{BusEvent, EventMetadata, EventTopic};
use shared_types::AgentContext;

/// An outbound message the transport could not deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDroppedEvent {
    pub metadata: EventMetadata,
    pub message_id: String,
    pub message_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    ActionMenu(ActionMenuEvent),
    IssueCredential(CredentialEvent),
    Mediation(MediationEvent),
    MessageDropped(MessageDroppedEvent),
}

impl AgentEvent {
    pub fn message_dropped(
        ctx: &AgentContext,
        message_id: impl Into<String>,
        message_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MessageDropped(MessageDroppedEvent {
            metadata: EventMetadata::from(ctx),
            message_id: message_id.into(),
            message_type: message_type.into(),
            reason: reason.into(),
        })
    }
}

impl From<ActionMenuEvent> for AgentEvent {
    fn from(event: ActionMenuEvent) -> Self {
        Self::ActionMenu(event)
    }
}

impl From<CredentialEvent> for AgentEvent {
    fn from(event: CredentialEvent) -> Self {
        Self::IssueCredential(event)
    }
}

impl From<MediationEvent> for AgentEvent {
    fn from(event: MediationEvent) -> Self {
        Self::Mediation(event)
    }
}

impl BusEvent for AgentEvent {
    fn topic(&self) -> EventTopic {
        match self {
            Self::ActionMenu(event) => event.topic(),
            Self::IssueCredential(event) => event.topic(),
            Self::Mediation(event) => event.topic(),
            Self::MessageDropped(_) => EventTopic::Agent,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::ActionMenu(event) => event.event_type(),
            Self::IssueCredential(event) => event.event_type(),
            Self::Mediation(event) => event.event_type(),
            Self::MessageDropped(_) => "MessageDropped",
        }
    }

    fn metadata(&self) -> &EventMetadata {
        match self {
            Self::ActionMenu(event) => event.metadata(),
            Self::IssueCredential(event) => event.metadata(),
            Self::Mediation(event) => event.metadata(),
            Self::MessageDropped(event) => &event.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_01_action_menu::{ActionMenuRecord, ActionMenuRole, ActionMenuState};
    use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};

    #[tokio::test]
    async fn test_protocol_events_reach_agent_bus() {
        let bus: InMemoryEventBus<AgentEvent> = InMemoryEventBus::new();
        let mut menus = bus.subscribe(EventFilter::topics(vec![EventTopic::ActionMenu]));
        let mut agent = bus.subscribe(EventFilter::topics(vec![EventTopic::Agent]));

        let ctx = AgentContext::default();
        let record = ActionMenuRecord::new(
            "conn-1",
            ActionMenuRole::Requester,
            ActionMenuState::AwaitingRootMenu,
            "thread-1",
        );
        bus.publish(ActionMenuEvent::state_changed(&ctx, &record, None))
            .await;
        bus.publish(AgentEvent::message_dropped(&ctx, "msg-1", "type", "unreachable"))
            .await;

        let events = menus.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "ActionMenuStateChanged");

        let events = agent.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "MessageDropped");
        assert_eq!(events[0].metadata().context_correlation_id, "default");
    }
}
