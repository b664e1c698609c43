//! # Shared Bus - Agent Event Bus
//!
//! Process-wide pub/sub for protocol state transitions.
//!
//! ## Publish / Subscribe
//!
//! ```text
//! ┌──────────────────┐                    ┌──────────────────┐
//! │ Exchange Service │                    │ Application code │
//! │                  │    publish()       │                  │
//! │                  │ ──────┐            │                  │
//! └──────────────────┘       │            └──────────────────┘
//!                            ▼                    ↑
//!                      ┌──────────────┐          │
//!                      │  Event Bus   │          │
//!                      │              │ ─────────┘
//!                      └──────────────┘  subscribe(filter)
//! ```
//!
//! ## Guarantees
//!
//! - **Snapshots only:** events carry owned clones; a subscriber can never
//!   reach the record the service is mutating.
//! - **Context scoping:** every event carries the agent context it belongs to
//!   and filters can be restricted to one context.
//! - **No backpressure on publishers:** slow subscribers lag and skip events
//!   rather than blocking a state transition.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BusEvent, EventFilter, EventMetadata, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
