//! Auto-accept policy

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When a handler may answer a credential message without the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoAcceptCredential {
    /// Always respond.
    Always,
    /// Respond when the content matches what was proposed or offered.
    ContentApproved,
    /// Leave every step to the application.
    #[default]
    Never,
}

impl AutoAcceptCredential {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::ContentApproved => "contentApproved",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for AutoAcceptCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoAcceptCredential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "contentApproved" | "content-approved" => Ok(Self::ContentApproved),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown auto accept value {other}")),
        }
    }
}

/// Record override first, then the agent default, then `Never`.
pub fn compose_auto_accept(
    record_override: Option<AutoAcceptCredential>,
    agent_default: Option<AutoAcceptCredential>,
) -> AutoAcceptCredential {
    record_override.or(agent_default).unwrap_or_default()
}
