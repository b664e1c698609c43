//! # DIDComm Message Model
//!
//! Every protocol message shares a common header (`@id`, `@type`, `~thread`,
//! `~service`, `~please_ack`, `~attach`). Protocol crates embed
//! [`MessageHeader`] with `#[serde(flatten)]` and implement [`AgentMessage`].
//!
//! ## Message Type URIs
//!
//! ```text
//! https://didcomm.org/action-menu/1.0/perform
//! └──────┬──────────┘ └────┬────┘ └┬┘ └──┬──┘
//!    doc uri          protocol  version  name
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decorators::{Attachment, PleaseAckDecorator, ServiceDecorator, ThreadDecorator};
use crate::errors::MessageError;

/// Document URI prefix used by every protocol in this workspace.
pub const DIDCOMM_DOC_URI: &str = "https://didcomm.org/";

/// Generate a fresh message or record identifier (uuid v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Statically known message type of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType {
    /// Protocol name, e.g. `action-menu`.
    pub protocol_name: &'static str,
    /// Protocol version, e.g. `1.0`.
    pub protocol_version: &'static str,
    /// Message name, e.g. `perform`.
    pub message_name: &'static str,
}

impl MessageType {
    /// Build a message type.
    pub const fn new(
        protocol_name: &'static str,
        protocol_version: &'static str,
        message_name: &'static str,
    ) -> Self {
        Self {
            protocol_name,
            protocol_version,
            message_name,
        }
    }

    /// Full `@type` URI.
    pub fn uri(&self) -> String {
        format!(
            "{}{}/{}/{}",
            DIDCOMM_DOC_URI, self.protocol_name, self.protocol_version, self.message_name
        )
    }

    /// Protocol URI without the message name.
    pub fn protocol_uri(&self) -> String {
        format!(
            "{}{}/{}",
            DIDCOMM_DOC_URI, self.protocol_name, self.protocol_version
        )
    }

    /// Major version component.
    pub fn major_version(&self) -> &'static str {
        self.protocol_version
            .split('.')
            .next()
            .unwrap_or(self.protocol_version)
    }

    /// Whether a parsed inbound type addresses this message.
    ///
    /// Minor versions are compatible; major versions must match.
    pub fn matches(&self, parsed: &ParsedMessageType) -> bool {
        parsed.protocol_name == self.protocol_name
            && parsed.major_version == self.major_version()
            && parsed.message_name == self.message_name
    }
}

/// A message type parsed from an inbound `@type` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessageType {
    /// Document URI, including trailing slash.
    pub document_uri: String,
    /// Protocol name.
    pub protocol_name: String,
    /// Major version.
    pub major_version: String,
    /// Minor version.
    pub minor_version: String,
    /// Message name.
    pub message_name: String,
}

impl ParsedMessageType {
    /// Parse `<doc-uri><protocol>/<major>.<minor>/<name>`.
    ///
    /// Accepts the legacy `did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/` prefix as well.
    pub fn parse(message_type: &str) -> Result<Self, MessageError> {
        let invalid = || MessageError::InvalidMessageType(message_type.to_string());

        let mut parts = message_type.rsplitn(4, '/');
        let message_name = parts.next().ok_or_else(invalid)?;
        let version = parts.next().ok_or_else(invalid)?;
        let protocol_name = parts.next().ok_or_else(invalid)?;
        let document_uri = parts.next().ok_or_else(invalid)?;

        let (major_version, minor_version) = version.split_once('.').ok_or_else(invalid)?;
        if message_name.is_empty()
            || protocol_name.is_empty()
            || major_version.parse::<u32>().is_err()
            || minor_version.parse::<u32>().is_err()
        {
            return Err(invalid());
        }

        Ok(Self {
            document_uri: format!("{}/", document_uri),
            protocol_name: protocol_name.to_string(),
            major_version: major_version.to_string(),
            minor_version: minor_version.to_string(),
            message_name: message_name.to_string(),
        })
    }

    /// Protocol URI normalized to the `https://didcomm.org/` prefix.
    pub fn protocol_uri(&self) -> String {
        format!(
            "{}{}/{}.{}",
            DIDCOMM_DOC_URI, self.protocol_name, self.major_version, self.minor_version
        )
    }
}

/// Header fields common to every DIDComm v1 message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Message id.
    #[serde(rename = "@id")]
    pub id: String,

    /// Message type URI.
    #[serde(rename = "@type")]
    pub message_type: String,

    /// Thread decorator.
    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadDecorator>,

    /// Service decorator for connection-less exchanges.
    #[serde(rename = "~service", default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceDecorator>,

    /// Acknowledgement request.
    #[serde(
        rename = "~please_ack",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub please_ack: Option<PleaseAckDecorator>,

    /// Appended attachments.
    #[serde(rename = "~attach", default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl MessageHeader {
    /// New header with a fresh id.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            id: generate_id(),
            message_type: message_type.uri(),
            thread: None,
            service: None,
            please_ack: None,
            attachments: Vec::new(),
        }
    }
}

/// A typed DIDComm message.
pub trait AgentMessage: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The statically known type of this message.
    const TYPE: MessageType;

    /// Shared header.
    fn header(&self) -> &MessageHeader;

    /// Mutable shared header.
    fn header_mut(&mut self) -> &mut MessageHeader;

    /// Message id.
    fn id(&self) -> &str {
        &self.header().id
    }

    /// Thread id: `~thread.thid` if present, the message id otherwise.
    fn thread_id(&self) -> &str {
        self.header()
            .thread
            .as_ref()
            .and_then(|t| t.thread_id.as_deref())
            .unwrap_or(self.header().id.as_str())
    }

    /// Parent thread id, if any.
    fn parent_thread_id(&self) -> Option<&str> {
        self.header()
            .thread
            .as_ref()
            .and_then(|t| t.parent_thread_id.as_deref())
    }

    /// Bind this message to a thread.
    fn set_thread(&mut self, thread_id: impl Into<String>, parent_thread_id: Option<String>) {
        let thread = self
            .header_mut()
            .thread
            .get_or_insert_with(ThreadDecorator::default);
        thread.thread_id = Some(thread_id.into());
        if parent_thread_id.is_some() {
            thread.parent_thread_id = parent_thread_id;
        }
    }

    /// Service decorator, if any.
    fn service(&self) -> Option<&ServiceDecorator> {
        self.header().service.as_ref()
    }

    /// Set the service decorator.
    fn set_service(&mut self, service: Option<ServiceDecorator>) {
        self.header_mut().service = service;
    }

    /// Request an acknowledgement.
    fn set_please_ack(&mut self) {
        self.header_mut().please_ack = Some(PleaseAckDecorator::default());
    }

    /// Attachment appended with `~attach` by id.
    fn appended_attachment(&self, id: &str) -> Option<&Attachment> {
        self.header().attachments.iter().find(|a| a.id == id)
    }

    /// Serialize into a plaintext JSON message.
    fn to_plaintext(&self) -> Result<PlaintextMessage, MessageError> {
        let value = serde_json::to_value(self)
            .map_err(|e| MessageError::Serialization(e.to_string()))?;
        PlaintextMessage::from_value(value)
    }
}

/// Implement [`AgentMessage`] for a struct with a flattened `header` field.
///
/// ```rust,ignore
/// impl_agent_message!(PerformMessage, "action-menu", "1.0", "perform");
/// ```
#[macro_export]
macro_rules! impl_agent_message {
    ($message:ty, $protocol:expr, $version:expr, $name:expr) => {
        impl $crate::AgentMessage for $message {
            const TYPE: $crate::MessageType = $crate::MessageType::new($protocol, $version, $name);

            fn header(&self) -> &$crate::MessageHeader {
                &self.header
            }

            fn header_mut(&mut self) -> &mut $crate::MessageHeader {
                &mut self.header
            }
        }
    };
}

/// A decrypted, untyped inbound or outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaintextMessage {
    value: serde_json::Value,
    message_type: String,
    id: String,
}

impl PlaintextMessage {
    /// Wrap a JSON value, checking that `@id` and `@type` are present.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MessageError> {
        let message_type = value
            .get("@type")
            .and_then(|t| t.as_str())
            .ok_or(MessageError::MissingField("@type"))?
            .to_string();
        let id = value
            .get("@id")
            .and_then(|t| t.as_str())
            .ok_or(MessageError::MissingField("@id"))?
            .to_string();
        Ok(Self {
            value,
            message_type,
            id,
        })
    }

    /// Parse from raw JSON text.
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        let value =
            serde_json::from_str(json).map_err(|e| MessageError::Deserialization(e.to_string()))?;
        Self::from_value(value)
    }

    /// Raw `@type` string.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Parsed `@type`.
    pub fn parsed_type(&self) -> Result<ParsedMessageType, MessageError> {
        ParsedMessageType::parse(&self.message_type)
    }

    /// Message id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Thread id (`~thread.thid` or `@id`).
    pub fn thread_id(&self) -> &str {
        self.value
            .get("~thread")
            .and_then(|t| t.get("thid"))
            .and_then(|t| t.as_str())
            .unwrap_or(self.id.as_str())
    }

    /// Underlying JSON.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Deserialize into a typed message, checking the `@type` first.
    pub fn to_typed<M: AgentMessage>(&self) -> Result<M, MessageError> {
        let parsed = self.parsed_type()?;
        if !M::TYPE.matches(&parsed) {
            return Err(MessageError::UnexpectedMessageType {
                expected: M::TYPE.uri(),
                actual: self.message_type.clone(),
            });
        }
        serde_json::from_value(self.value.clone())
            .map_err(|e| MessageError::Deserialization(e.to_string()))
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> String {
        self.value.to_string()
    }
}
