//! # Issue Credential Protocol
//!
//! **Protocol:** `https://didcomm.org/issue-credential/1.0` (Aries RFC 0036)
//! **Roles:** `holder`, `issuer`
//!
//! ## Purpose
//!
//! Moves a credential from an issuer to a holder in up to four round trips.
//! Either side may open: the holder with a proposal, the issuer with an
//! offer. Proposal and offer may be exchanged back and forth (negotiation)
//! until one side accepts.
//!
//! ## State Machine
//!
//! ```text
//!  Holder                                            Issuer
//!  ──────                                            ──────
//!  [proposal-sent]   ──propose-credential──→   [proposal-received]
//!  [offer-received]  ←──offer-credential────   [offer-sent]
//!  [request-sent]    ──request-credential──→   [request-received]
//!  [credential-received] ←──issue-credential── [credential-issued]
//!  [done]            ──ack─────────────────→   [done]
//!
//!  offer-received ──decline──→ [declined]
//! ```
//!
//! | Operation | Allowed from | Result state |
//! |-----------|--------------|--------------|
//! | `create_proposal` | new | `proposal-sent` |
//! | `process_proposal` | new, `offer-sent` | `proposal-received` |
//! | `accept_proposal`, `negotiate_proposal` | `proposal-received` | `offer-sent` |
//! | `create_offer` | new | `offer-sent` |
//! | `process_offer` | new, `proposal-sent` | `offer-received` |
//! | `accept_offer` | `offer-received` | `request-sent` |
//! | `negotiate_offer` | `offer-received` | `proposal-sent` |
//! | `decline_offer` | `offer-received` | `declined` |
//! | `process_request` | `offer-sent` | `request-received` |
//! | `accept_request` | `request-received` | `credential-issued` |
//! | `process_credential` | `request-sent` | `credential-received` |
//! | `accept_credential` | `credential-received` | `done` |
//! | `process_ack` | `credential-issued` | `done` |
//!
//! ## Credential Formats
//!
//! Attachment payloads are built and checked by a [`CredentialFormatService`].
//! [`JsonCredentialFormatService`] is an unsigned development format.
//!
//! ## Module Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ipc/handler.rs     - CredentialHandler (auto-accept)       │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs   - CredentialsApi trait                  │
//! │  ports/outbound.rs  - store, events, CredentialFormatService│
//! │  service.rs         - CredentialService (state machine)     │
//! │  adapters/          - JSON credential format                │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  domain/            - record, state, preview, auto-accept   │
//! │  messages.rs        - wire messages                         │
//! │  events.rs          - CredentialStateChanged                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod events;
pub mod ipc;
pub mod messages;
pub mod ports;
pub mod service;

pub use adapters::{JsonCredential, JsonCredentialFormatService};
pub use domain::*;
pub use error::{CredentialError, CredentialProblemReportReason, CredentialResult};
pub use events::{CredentialEvent, CredentialStateChangedEvent};
pub use ipc::CredentialHandler;
pub use messages::{
    protocol, AckStatus, CredentialAckMessage, CredentialMessage, CredentialProblemReportMessage,
    IssueCredentialMessage, OfferCredentialMessage, ProposeCredentialMessage,
    RequestCredentialMessage, PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use ports::*;
pub use service::CredentialService;
