//! Action Menu 1.0 messages
//!
//! | `@type` suffix | Direction |
//! |----------------|-----------|
//! | `menu-request` | requester → responder |
//! | `menu` | responder → requester |
//! | `perform` | requester → responder |
//! | `problem-report` | either |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{
    impl_agent_message, AgentMessage, MessageError, MessageHeader, PlaintextMessage,
    ProblemReportBody, ProblemReportDescription, Protocol,
};

use crate::domain::{ActionMenu, ActionMenuOption, ActionMenuSelection};

pub const PROTOCOL_NAME: &str = "action-menu";
pub const PROTOCOL_VERSION: &str = "1.0";

/// Feature registry entry.
pub fn protocol() -> Protocol {
    Protocol::new(
        format!("https://didcomm.org/{PROTOCOL_NAME}/{PROTOCOL_VERSION}"),
        &["requester", "responder"],
    )
}

/// `menu-request`: ask the responder for its root menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuRequestMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
}

impl_agent_message!(MenuRequestMessage, PROTOCOL_NAME, PROTOCOL_VERSION, "menu-request");

impl MenuRequestMessage {
    pub fn new() -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
        }
    }
}

impl Default for MenuRequestMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// `menu`: the options the requester may choose from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errormsg: Option<String>,
    #[serde(default)]
    pub options: Vec<ActionMenuOption>,
}

impl_agent_message!(MenuMessage, PROTOCOL_NAME, PROTOCOL_VERSION, "menu");

impl MenuMessage {
    pub fn new(menu: &ActionMenu) -> Self {
        Self {
            header: MessageHeader::new(Self::TYPE),
            title: menu.title.clone(),
            description: menu.description.clone(),
            errormsg: None,
            options: menu.options.clone(),
        }
    }

    /// The menu carried by this message, validated.
    pub fn to_menu(&self) -> crate::error::ActionMenuResult<ActionMenu> {
        ActionMenu::new(
            self.title.clone(),
            self.description.clone(),
            self.options.clone(),
        )
    }
}

/// `perform`: the option the requester selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
}

impl_agent_message!(PerformMessage, PROTOCOL_NAME, PROTOCOL_VERSION, "perform");

impl PerformMessage {
    /// Perform message on an existing thread.
    pub fn new(selection: &ActionMenuSelection, thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
            name: selection.name.clone(),
            params: selection.params.clone(),
        };
        message.set_thread(thread_id, None);
        message
    }

    pub fn selection(&self) -> ActionMenuSelection {
        ActionMenuSelection {
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }
}

/// `problem-report` of the action menu protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMenuProblemReportMessage {
    #[serde(flatten)]
    pub header: MessageHeader,
    #[serde(flatten)]
    pub body: ProblemReportBody,
}

impl_agent_message!(
    ActionMenuProblemReportMessage,
    PROTOCOL_NAME,
    PROTOCOL_VERSION,
    "problem-report"
);

impl ActionMenuProblemReportMessage {
    pub fn new(description: ProblemReportDescription, thread_id: &str) -> Self {
        let mut message = Self {
            header: MessageHeader::new(Self::TYPE),
            body: ProblemReportBody::new(description),
        };
        message.set_thread(thread_id, None);
        message
    }
}

/// Every inbound action menu message, parsed by `@type`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionMenuMessage {
    MenuRequest(MenuRequestMessage),
    Menu(MenuMessage),
    Perform(PerformMessage),
    ProblemReport(ActionMenuProblemReportMessage),
}

impl ActionMenuMessage {
    /// Parse a plaintext message addressed to this protocol.
    pub fn parse(plaintext: &PlaintextMessage) -> Result<Self, MessageError> {
        let parsed = plaintext.parsed_type()?;
        if parsed.protocol_name != PROTOCOL_NAME || parsed.major_version != "1" {
            return Err(MessageError::InvalidMessageType(
                plaintext.message_type().to_string(),
            ));
        }
        match parsed.message_name.as_str() {
            "menu-request" => Ok(Self::MenuRequest(plaintext.to_typed()?)),
            "menu" => Ok(Self::Menu(plaintext.to_typed()?)),
            "perform" => Ok(Self::Perform(plaintext.to_typed()?)),
            "problem-report" => Ok(Self::ProblemReport(plaintext.to_typed()?)),
            _ => Err(MessageError::InvalidMessageType(
                plaintext.message_type().to_string(),
            )),
        }
    }

    /// Message name, for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MenuRequest(_) => MenuRequestMessage::TYPE.message_name,
            Self::Menu(_) => MenuMessage::TYPE.message_name,
            Self::Perform(_) => PerformMessage::TYPE.message_name,
            Self::ProblemReport(_) => ActionMenuProblemReportMessage::TYPE.message_name,
        }
    }
}
