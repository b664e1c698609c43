//! Credential exchange states and roles
//!
//! ```text
//!  holder                                      issuer
//!  ──────                                      ──────
//!  [proposal-sent] ···propose-credential···→ [proposal-received]
//!                                                   │ accept/negotiate
//!  [offer-received] ←···offer-credential···  [offer-sent]
//!     │ accept          (decline ──→ [declined])
//!  [request-sent] ···request-credential···→ [request-received]
//!                                                   │ accept
//!  [credential-received] ←···issue-credential···  [credential-issued]
//!     │ accept
//!  [done] ···ack···────────────────────────→ [done]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a credential exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialState {
    ProposalSent,
    ProposalReceived,
    OfferSent,
    OfferReceived,
    Declined,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
    Done,
    Abandoned,
}

impl CredentialState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProposalSent => "proposal-sent",
            Self::ProposalReceived => "proposal-received",
            Self::OfferSent => "offer-sent",
            Self::OfferReceived => "offer-received",
            Self::Declined => "declined",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::CredentialIssued => "credential-issued",
            Self::CredentialReceived => "credential-received",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role played in a credential exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialRole {
    Holder,
    Issuer,
}

impl CredentialRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Issuer => "issuer",
        }
    }
}

impl fmt::Display for CredentialRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_names() {
        assert_eq!(
            serde_json::to_value(CredentialState::CredentialReceived).unwrap(),
            "credential-received"
        );
        assert_eq!(CredentialState::Declined.to_string(), "declined");
    }

    #[test]
    fn test_role_wire_names() {
        let role: CredentialRole = serde_json::from_str("\"issuer\"").unwrap();
        assert_eq!(role, CredentialRole::Issuer);
    }
}
