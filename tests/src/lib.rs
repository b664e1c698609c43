//! # DIDComm Agent Test Suite
//!
//! Protocol flows between two in-process agents.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mod.rs              # AgentPair fixture
//!     ├── action_menu_flow.rs
//!     ├── credential_flow.rs
//!     └── mediation_flow.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dc-tests
//! cargo test -p dc-tests integration::credential_flow
//! ```

pub mod integration;
