//! # Action Menu Protocol
//!
//! **Protocol:** `https://didcomm.org/action-menu/1.0` (Aries RFC 0509)
//! **Roles:** `requester`, `responder`
//!
//! ## Purpose
//!
//! Lets a responder publish a menu of named options (optionally with a form)
//! over an established connection, and lets the requester pick one. One
//! record exists per (connection, role); it is reset in place when a new
//! flow starts on the same connection.
//!
//! ## State Machine
//!
//! ```text
//!  Requester                                   Responder
//!  ─────────                                   ─────────
//!  [null] ──menu-request──→ [awaiting-root-menu]     ──→ [preparing-root-menu]
//!                                      ←──menu──  [awaiting-selection]
//!  [preparing-selection]
//!         └──perform──→ [done]                       ──→ [done]
//!
//!  clear from any state ──→ [null]
//! ```
//!
//! | Operation | Role | Allowed from | Result state |
//! |-----------|------|--------------|--------------|
//! | `create_request` | requester | any | `awaiting-root-menu` |
//! | `process_request` | responder | any | `preparing-root-menu` |
//! | `create_menu` | responder | any | `awaiting-selection` |
//! | `process_menu` | requester | any | `preparing-selection` |
//! | `create_perform` | requester | `preparing-selection` | `done` |
//! | `process_perform` | responder | `awaiting-selection` | `done` |
//! | `clear_menu` | both | any | `null` |
//!
//! ## Thread Rules
//!
//! - A reset on a record in `null` keeps the record's thread.
//! - Any other reset adopts the new thread (outbound message id, or the
//!   inbound message's thread).
//! - A `perform` on a cleared responder record is answered with a
//!   `problem-report` (code `timeout`) on the perform's thread.
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ipc/handler.rs     - ActionMenuHandler (parse + dispatch)  │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs   - ActionMenuApi trait                   │
//! │  ports/outbound.rs  - ActionMenuStore, ActionMenuEventPub.  │
//! │  service.rs         - ActionMenuService (state machine)     │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  domain/            - record, menu, state, role             │
//! │  messages.rs        - wire messages                         │
//! │  events.rs          - ActionMenuStateChanged                │
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
pub use error::{ActionMenuError, ActionMenuProblemReportReason, ActionMenuResult};
pub use events::{ActionMenuEvent, ActionMenuStateChangedEvent};
pub use ipc::ActionMenuHandler;
pub use messages::{
    protocol, ActionMenuMessage, ActionMenuProblemReportMessage, MenuMessage,
    MenuRequestMessage, PerformMessage, PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use ports::*;
pub use service::ActionMenuService;
