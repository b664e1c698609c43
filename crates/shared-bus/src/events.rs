//! # Agent Events
//!
//! The bus is generic over the event type. Each protocol crate defines its own
//! event enum and implements [`BusEvent`]; the agent runtime aggregates them
//! into one enum so a single bus carries every protocol.

use serde::{Deserialize, Serialize};
use shared_types::AgentContext;

/// Metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Agent context the event belongs to.
    pub context_correlation_id: String,
}

impl From<&AgentContext> for EventMetadata {
    fn from(ctx: &AgentContext) -> Self {
        Self {
            context_correlation_id: ctx.context_correlation_id.clone(),
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Action menu exchanges (RFC 0509).
    ActionMenu,
    /// Credential issuance exchanges.
    IssueCredential,
    /// Mediation coordination.
    Mediation,
    /// Agent-level events (message dropped, problem report sent).
    Agent,
    /// All topics (wildcard).
    All,
}

/// Anything that can travel over the bus.
pub trait BusEvent: Clone + Send + Sync + 'static {
    /// Topic used for filtering.
    fn topic(&self) -> EventTopic;

    /// Stable event type name, e.g. `ActionMenuStateChanged`.
    fn event_type(&self) -> &'static str;

    /// Metadata carrying the agent context.
    fn metadata(&self) -> &EventMetadata;
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to subscribe to. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Agent contexts to include. Empty means every context.
    pub context_ids: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            context_ids: Vec::new(),
        }
    }

    /// Restrict the filter to one agent context.
    #[must_use]
    pub fn for_context(mut self, ctx: &AgentContext) -> Self {
        self.context_ids.push(ctx.context_correlation_id.clone());
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches<E: BusEvent>(&self, event: &E) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let context_match = self.context_ids.is_empty()
            || self
                .context_ids
                .iter()
                .any(|id| *id == event.metadata().context_correlation_id);

        topic_match && context_match
    }
}
