//! Coordinate Mediation 1.0 messages
//!
//! | `@type` suffix | Direction |
//! |----------------|-----------|
//! | `mediate-request` | recipient → mediator |
//! | `mediate-grant` | mediator → recipient |
//! | `mediate-deny` | mediator → recipient |
//! | `keylist-update` | recipient → mediator |
//! | `keylist-update-response` | mediator → recipient |

use serde::{Deserialize, Serialize};
use shared_types::{
    impl_agent_message, AgentMessage, MessageError, MessageHeader, PlaintextMessage, Protocol,
};

use crate::domain::{KeylistUpdate, KeylistUpdated, MediatorRouting};

pub const PROTOCOL_NAME: &str = "coordinate-mediation";
pub const PROTOCOL_VERSION: &str = "1.0";

/// Feature registry entry.
pub fn protocol() -> Protocol {
    Protocol::new(
        format!("https://didcomm.org/{PROTOCOL_NAME}/{PROTOCOL_VERSION}"),
        &["mediator", "recipient"],
    )
}

/// `mediate-request`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediationRequestMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
}

impl_agent_message!(
    MediationRequestMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "mediate-request"
);

impl MediationRequestMessage {
    pub fn new() -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
        }
    }
}

impl Default for MediationRequestMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// `mediate-grant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediationGrantMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub routing_keys: Vec<String>,
}

impl_agent_message!(
    MediationGrantMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "mediate-grant"
);

impl MediationGrantMessage {
    pub fn new(routing: &MediatorRouting, thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
            endpoint: routing.endpoint.clone(),
            routing_keys: routing.routing_keys.clone(),
        };
        message.set_thread(thread_id, None);
        message
    }
}

/// `mediate-deny`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediationDenyMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
}

impl_agent_message!(
    MediationDenyMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "mediate-deny"
);

impl MediationDenyMessage {
    pub fn new(thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
        };
        message.set_thread(thread_id, None);
        message
    }
}

/// `keylist-update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeylistUpdateMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub updates: Vec<KeylistUpdate>,
}

impl_agent_message!(
    KeylistUpdateMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "keylist-update"
);

impl KeylistUpdateMessage {
    pub fn new(updates: Vec<KeylistUpdate>) -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
            updates,
        }
    }
}

/// `keylist-update-response`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeylistUpdateResponseMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub updated: Vec<KeylistUpdated>,
}

impl_agent_message!(
    KeylistUpdateResponseMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "keylist-update-response"
);

impl KeylistUpdateResponseMessage {
    pub fn new(updated: Vec<KeylistUpdated>, thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
            updated,
        };
        message.set_thread(thread_id, None);
        message
    }
}

/// Every inbound mediation message, parsed by `@type`.
#[derive(Debug, Clone, PartialEq)]
pub enum MediationMessage {
    Request(MediationRequestMessage),
    Grant(MediationGrantMessage),
    Deny(MediationDenyMessage),
    KeylistUpdate(KeylistUpdateMessage),
    KeylistUpdateResponse(KeylistUpdateResponseMessage),
}

impl MediationMessage {
    pub fn parse(plaintext: &PlaintextMessage) -> Result<Self, MessageError> {
        let parsed = plaintext.parsed_type()?;
        if parsed.protocol_name != PROTOCOL_NAME || parsed.major_version != "1" {
            return Err(MessageError::InvalidMessageType(
                plaintext.message_type().to_string(),
            ));
        }
        match parsed.message_name.as_str() {
            "mediate-request" => Ok(Self::Request(plaintext.to_typed()?)),
            "mediate-grant" => Ok(Self::Grant(plaintext.to_typed()?)),
            "mediate-deny" => Ok(Self::Deny(plaintext.to_typed()?)),
            "keylist-update" => Ok(Self::KeylistUpdate(plaintext.to_typed()?)),
            "keylist-update-response" => Ok(Self::KeylistUpdateResponse(plaintext.to_typed()?)),
            _ => Err(MessageError::InvalidMessageType(
                plaintext.message_type().to_string(),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Request(_) => MediationRequestMessage::TYPE.message_name,
            Self::Grant(_) => MediationGrantMessage::TYPE.message_name,
            Self::Deny(_) => MediationDenyMessage::TYPE.message_name,
            Self::KeylistUpdate(_) => KeylistUpdateMessage::TYPE.message_name,
            Self::KeylistUpdateResponse(_) => KeylistUpdateResponseMessage::TYPE.message_name,
        }
    }
}
