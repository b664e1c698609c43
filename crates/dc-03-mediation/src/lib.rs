//! # Coordinate Mediation Protocol
//!
//! **Protocol:** `https://didcomm.org/coordinate-mediation/1.0` (Aries RFC 0211)
//! **Roles:** `mediator`, `recipient`
//!
//! ## Purpose
//!
//! A recipient asks a mediator to receive messages on its behalf. Once
//! mediation is granted the recipient registers the keys the mediator must
//! route for, and publishes the mediator's endpoint and routing keys in its
//! own DIDComm services.
//!
//! ## State Machine
//!
//! ```text
//!  Recipient                                     Mediator
//!  ─────────                                     ────────
//!  [requested] ──mediate-request──→              [requested]
//!                                                    │ grant / deny
//!  [granted] ←──mediate-grant──                  [granted]
//!  [denied]  ←──mediate-deny───                  [denied]
//!
//!  granted only:
//!  keylist-update ──────────────→ add/remove recipient keys
//!  apply successes ←─ keylist-update-response
//! ```
//!
//! | Operation | Role | Allowed from | Result state |
//! |-----------|------|--------------|--------------|
//! | `create_request` | recipient | none, `requested`, `denied` | `requested` |
//! | `process_mediation_request` | mediator | none, `requested`, `denied` | `requested` |
//! | `create_grant_mediation_message` | mediator | `requested` | `granted` |
//! | `create_deny_mediation_message` | mediator | `requested` | `denied` |
//! | `process_mediation_grant` | recipient | `requested` | `granted` |
//! | `process_mediation_deny` | recipient | `requested` | `denied` |
//! | `process_keylist_update_request` | mediator | `granted` | unchanged |
//! | `process_keylist_update_results` | recipient | `granted` | unchanged |
//!
//! ## Events
//!
//! - `MediationStateChanged` on every state transition.
//! - `RecipientKeylistUpdated` when the mediator's keylist response has been
//!   applied on the recipient side.
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ipc/handler.rs     - MediationHandler (auto-grant, replies)│
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs   - MediationApi trait                    │
//! │  ports/outbound.rs  - MediationStore, MediationEventPub.    │
//! │  service.rs         - MediationService (both roles)         │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  domain/            - record, keylist, state, role          │
//! │  messages.rs        - wire messages                         │
//! │  events.rs          - MediationStateChanged, KeylistUpdated │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod domain;
pub mod error;
pub mod events;
pub mod ipc;
pub mod messages;
pub mod ports;
pub mod service;

pub use domain::*;
pub use error::{MediationError, MediationResult};
pub use events::{KeylistUpdatedEvent, MediationEvent, MediationStateChangedEvent};
pub use ipc::MediationHandler;
pub use messages::{
    protocol, KeylistUpdateMessage, KeylistUpdateResponseMessage, MediationDenyMessage,
    MediationGrantMessage, MediationMessage, MediationRequestMessage, PROTOCOL_NAME,
    PROTOCOL_VERSION,
};
pub use ports::*;
pub use service::MediationService;
