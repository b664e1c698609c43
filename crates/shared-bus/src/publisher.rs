//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{BusEvent, EventFilter};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
///
/// Protocol services depend on `EventPublisher<TheirEvent>`; any bus whose
/// event type is constructible from `TheirEvent` satisfies it.
#[async_trait]
pub trait EventPublisher<T>: Send + Sync
where
    T: Send + 'static,
{
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: T) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Events are cloned per receiver, so subscribers never share state with the
/// publisher.
pub struct InMemoryEventBus<E: BusEvent> {
    /// Broadcast sender for events.
    sender: broadcast::Sender<E>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl<E: BusEvent> InMemoryEventBus<E> {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription<E> {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}", filter.topics);

        *self
            .subscriptions
            .write()
            .entry(topic_key.clone())
            .or_insert(0) += 1;

        debug!(topics = ?filter.topics, contexts = ?filter.context_ids, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream<E> {
        EventStream::new(self.subscribe(filter))
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E: BusEvent> Default for InMemoryEventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E, T> EventPublisher<T> for InMemoryEventBus<E>
where
    E: BusEvent,
    T: Into<E> + Send + 'static,
{
    async fn publish(&self, event: T) -> usize {
        let event: E = event.into();
        let topic = event.topic();
        let event_type = event.event_type();
        let context = event.metadata().context_correlation_id.clone();

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    topic = ?topic,
                    event_type,
                    context = %context,
                    receivers = receiver_count,
                    "Event published"
                );
                receiver_count
            }
            Err(_) => {
                // Nobody listening; state changes do not require subscribers.
                trace!(topic = ?topic, event_type, context = %context, "Event had no receivers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::tests::TestEvent;
    use crate::events::EventTopic;

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::<TestEvent>::new();
        let receivers = bus
            .publish(TestEvent::new(EventTopic::ActionMenu, "ctx", 1))
            .await;
        assert_eq!(receivers, 0);
        assert_eq!(EventPublisher::<TestEvent>::events_published(&bus), 1);
    }

    #[tokio::test]
    async fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::<TestEvent>::new();

        // Create subscriber BEFORE publishing
        let _sub = bus.subscribe(EventFilter::all());

        let receivers = bus
            .publish(TestEvent::new(EventTopic::ActionMenu, "ctx", 1))
            .await;

        assert_eq!(receivers, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = InMemoryEventBus::<TestEvent>::new();

        let _sub1 = bus.subscribe(EventFilter::all());
        let _sub2 = bus.subscribe(EventFilter::all());
        let _sub3 = bus.subscribe(EventFilter::topics(vec![EventTopic::Mediation]));

        let receivers = bus
            .publish(TestEvent::new(EventTopic::ActionMenu, "ctx", 1))
            .await;

        // Filtering happens on the receiving side.
        assert_eq!(receivers, 3);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[derive(Debug, Clone)]
    struct Wrapped(TestEvent);

    impl From<TestEvent> for Wrapped {
        fn from(event: TestEvent) -> Self {
            Wrapped(event)
        }
    }

    impl BusEvent for Wrapped {
        fn topic(&self) -> EventTopic {
            self.0.topic()
        }

        fn event_type(&self) -> &'static str {
            self.0.event_type()
        }

        fn metadata(&self) -> &crate::events::EventMetadata {
            self.0.metadata()
        }
    }

    #[tokio::test]
    async fn test_publish_converts_into_bus_event() {
        let bus = InMemoryEventBus::<Wrapped>::new();
        let mut sub = bus.subscribe(EventFilter::all());

        let publisher: &dyn EventPublisher<TestEvent> = &bus;
        publisher
            .publish(TestEvent::new(EventTopic::Mediation, "ctx", 7))
            .await;

        let received = sub.try_recv().unwrap().unwrap();
        assert_eq!(received.0.value, 7);
    }

    #[test]
    fn test_custom_and_zero_capacity() {
        assert_eq!(InMemoryEventBus::<TestEvent>::with_capacity(100).capacity(), 100);
        assert_eq!(InMemoryEventBus::<TestEvent>::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_default_bus() {
        let bus = InMemoryEventBus::<TestEvent>::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
