//! # Message Decorators
//!
//! `~thread`, `~service`, `~please_ack` and attachments (`~attach` and the
//! protocol specific `*~attach` fields).

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::MessageError;
use crate::message::generate_id;

/// Thread decorator (`~thread`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadDecorator {
    /// Thread id.
    #[serde(rename = "thid", default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Parent thread id.
    #[serde(rename = "pthid", default, skip_serializing_if = "Option::is_none")]
    pub parent_thread_id: Option<String>,

    /// Sender order within the thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_order: Option<u64>,

    /// Highest order received from each party.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub received_orders: BTreeMap<String, u64>,
}

/// Service decorator (`~service`) for connection-less exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDecorator {
    /// Keys the receiver encrypts to.
    pub recipient_keys: Vec<String>,
    /// Mediator routing keys.
    #[serde(default)]
    pub routing_keys: Vec<String>,
    /// Where to deliver.
    pub service_endpoint: String,
}

impl ServiceDecorator {
    /// Validate required fields.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.recipient_keys.is_empty() {
            return Err(MessageError::Validation(
                "service decorator requires at least one recipient key".into(),
            ));
        }
        if self.service_endpoint.trim().is_empty() {
            return Err(MessageError::Validation(
                "service decorator requires a service endpoint".into(),
            ));
        }
        Ok(())
    }
}

/// Acknowledgement request (`~please_ack`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PleaseAckDecorator {
    /// When to ack. Empty means on receipt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on: Vec<String>,
}

/// Attachment payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentData {
    /// Base64 encoded bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,

    /// Inline JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,

    /// Remote links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// Hash of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A DIDComm attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment id, referenced by format descriptors.
    #[serde(rename = "@id")]
    pub id: String,

    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Suggested file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// MIME type of the content.
    #[serde(
        rename = "mime-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,

    /// Content.
    pub data: AttachmentData,
}

impl Attachment {
    /// Attachment carrying a JSON value as base64, as the Indy formats do.
    pub fn from_json_base64(id: impl Into<String>, value: &serde_json::Value) -> Self {
        Self {
            id: id.into(),
            description: None,
            filename: None,
            mime_type: Some("application/json".into()),
            data: AttachmentData {
                base64: Some(STANDARD.encode(value.to_string())),
                ..Default::default()
            },
        }
    }

    /// Attachment with inline JSON and a generated id.
    pub fn inline_json(value: serde_json::Value) -> Self {
        Self {
            id: generate_id(),
            description: None,
            filename: None,
            mime_type: Some("application/json".into()),
            data: AttachmentData {
                json: Some(value),
                ..Default::default()
            },
        }
    }

    /// Decode the payload as JSON, from either `json` or `base64`.
    pub fn data_as_json(&self) -> Result<serde_json::Value, MessageError> {
        if let Some(json) = &self.data.json {
            return Ok(json.clone());
        }
        let encoded = self.data.base64.as_ref().ok_or_else(|| {
            MessageError::Validation(format!("attachment {} has no inline data", self.id))
        })?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| MessageError::Deserialization(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| MessageError::Deserialization(e.to_string()))
    }
}
