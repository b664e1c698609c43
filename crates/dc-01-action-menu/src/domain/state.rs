//! Action menu states and roles
//!
//! ```text
//!  requester                                responder
//!  ─────────                                ─────────
//!  [null] ──createRequest──→ [awaiting-root-menu]
//!                                  ···menu-request···→ [preparing-root-menu]
//!                                                            │ createMenu
//!  [preparing-selection] ←···menu···  [awaiting-selection] ←─┘
//!        │ createPerform
//!        ↓
//!      [done] ···perform···────────────────────────→ [done]
//! ```
//!
//! `clearMenu` moves either side back to `null` from any state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of an action menu exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionMenuState {
    Null,
    AwaitingRootMenu,
    PreparingRootMenu,
    PreparingSelection,
    AwaitingSelection,
    Done,
}

impl ActionMenuState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::AwaitingRootMenu => "awaiting-root-menu",
            Self::PreparingRootMenu => "preparing-root-menu",
            Self::PreparingSelection => "preparing-selection",
            Self::AwaitingSelection => "awaiting-selection",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ActionMenuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role played in an action menu exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMenuRole {
    /// Asks for menus and performs selections.
    Requester,
    /// Publishes menus and receives selections.
    Responder,
}

impl ActionMenuRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requester => "requester",
            Self::Responder => "responder",
        }
    }
}

impl fmt::Display for ActionMenuRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
