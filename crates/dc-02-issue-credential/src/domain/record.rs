//! Credential exchange record

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_storage::{Record, Tags, TagsExt};
use shared_types::{generate_id, Attachment};

use super::auto_accept::AutoAcceptCredential;
use super::preview::CredentialPreviewAttribute;
use super::state::{CredentialRole, CredentialState};
use crate::error::{CredentialError, CredentialResult};

/// Protocol version string stored on records of this crate.
pub const PROTOCOL_VERSION_V1: &str = "v1";

/// Metadata key for what the holder learned from the offer.
pub const METADATA_CREDENTIAL: &str = "_internal/indyCredential";
/// Metadata key for the holder's request secrets.
pub const METADATA_REQUEST: &str = "_internal/indyRequest";

/// One credential issuance, keyed by thread and connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialExchangeRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Absent for connection-less issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_thread_id: Option<String>,
    pub state: CredentialState,
    pub role: CredentialRole,
    pub protocol_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_accept_credential: Option<AutoAcceptCredential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_attributes: Option<Vec<CredentialPreviewAttribute>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Ids of credentials stored by the holder.
    #[serde(default)]
    pub credential_ids: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Tags,
}

impl CredentialExchangeRecord {
    pub fn new(
        role: CredentialRole,
        state: CredentialState,
        thread_id: impl Into<String>,
        connection_id: Option<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            created_at: Utc::now(),
            updated_at: None,
            connection_id,
            thread_id: thread_id.into(),
            parent_thread_id: None,
            state,
            role,
            protocol_version: PROTOCOL_VERSION_V1.to_string(),
            auto_accept_credential: None,
            credential_attributes: None,
            linked_attachments: None,
            error_message: None,
            credential_ids: Vec::new(),
            metadata: BTreeMap::new(),
            tags: Tags::new(),
        }
    }

    /// Fail unless the record is in one of `allowed`.
    pub fn assert_state(&self, allowed: &[CredentialState]) -> CredentialResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(CredentialError::InvalidState {
            record_id: self.id.clone(),
            current: self.state,
            allowed: allowed.to_vec(),
        })
    }

    pub fn assert_protocol_version(&self, expected: &str) -> CredentialResult<()> {
        if self.protocol_version == expected {
            return Ok(());
        }
        Err(CredentialError::ProtocolVersion {
            record_id: self.id.clone(),
            expected: expected.to_string(),
            actual: self.protocol_version.clone(),
        })
    }

    pub fn set_metadata(&mut self, key: &str, value: serde_json::Value) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

impl Record for CredentialExchangeRecord {
    const RECORD_TYPE: &'static str = "CredentialRecord";

    fn id(&self) -> &str {
        &self.id
    }

    fn default_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("threadId".into(), self.thread_id.as_str().into());
        tags.insert("state".into(), self.state.as_str().into());
        tags.insert("role".into(), self.role.as_str().into());
        tags.insert_opt("connectionId", self.connection_id.as_deref());
        tags.insert_opt("parentThreadId", self.parent_thread_id.as_deref());
        if !self.credential_ids.is_empty() {
            tags.insert("credentialIds".into(), self.credential_ids.clone().into());
        }
        tags
    }

    fn custom_tags(&self) -> &Tags {
        &self.tags
    }

    fn set_updated_at(&mut self, updated_at: DateTime<Utc>) {
        self.updated_at = Some(updated_at);
    }
}
