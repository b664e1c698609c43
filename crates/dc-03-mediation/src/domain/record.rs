//! Mediation record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_storage::{Record, TagValue, Tags, TagsExt};
use shared_types::generate_id;

use super::state::{MediationRole, MediationState};
use crate::error::{MediationError, MediationResult};

/// Custom tag marking the recipient's default mediator.
pub const DEFAULT_MEDIATOR_TAG: &str = "default";

/// Endpoint and routing keys a mediator hands out in `mediate-grant`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediatorRouting {
    pub endpoint: Option<String>,
    pub routing_keys: Vec<String>,
}

/// One mediation relationship, keyed by connection and role.
///
/// On the mediator side `recipient_keys` is the routing table for the
/// connection. On the recipient side it mirrors what the mediator confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub connection_id: String,
    pub thread_id: String,
    pub role: MediationRole,
    pub state: MediationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub routing_keys: Vec<String>,
    #[serde(default)]
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
}

impl MediationRecord {
    pub fn new(
        connection_id: impl Into<String>,
        role: MediationRole,
        state: MediationState,
        thread_id: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            created_at: Utc::now(),
            updated_at: None,
            connection_id: connection_id.into(),
            thread_id: thread_id.into(),
            role,
            state,
            endpoint: None,
            routing_keys: Vec::new(),
            recipient_keys: Vec::new(),
            tags: Tags::new(),
        }
    }

    /// Granted mediation can route messages.
    pub fn is_ready(&self) -> bool {
        self.state == MediationState::Granted
    }

    pub fn assert_ready(&self) -> MediationResult<()> {
        self.assert_state(&[MediationState::Granted])
    }

    /// Fail unless the record is in one of `allowed`.
    pub fn assert_state(&self, allowed: &[MediationState]) -> MediationResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(MediationError::InvalidState {
            record_id: self.id.clone(),
            current: self.state,
            allowed: allowed.to_vec(),
        })
    }

    pub fn assert_role(&self, expected: MediationRole) -> MediationResult<()> {
        if self.role == expected {
            return Ok(());
        }
        Err(MediationError::InvalidRole {
            record_id: self.id.clone(),
            current: self.role,
            expected,
        })
    }

    /// Returns `false` when the key was already present.
    pub fn add_recipient_key(&mut self, key: &str) -> bool {
        if self.recipient_keys.iter().any(|k| k == key) {
            return false;
        }
        self.recipient_keys.push(key.to_string());
        true
    }

    /// Returns `false` when the key was not present.
    pub fn remove_recipient_key(&mut self, key: &str) -> bool {
        let before = self.recipient_keys.len();
        self.recipient_keys.retain(|k| k != key);
        self.recipient_keys.len() != before
    }

    pub fn is_default(&self) -> bool {
        matches!(self.tags.get(DEFAULT_MEDIATOR_TAG), Some(TagValue::Bool(true)))
    }

    pub fn set_default(&mut self, default: bool) {
        self.tags
            .insert(DEFAULT_MEDIATOR_TAG.to_string(), TagValue::Bool(default));
    }
}

impl Record for MediationRecord {
    const RECORD_TYPE: &'static str = "MediationRecord";

    fn id(&self) -> &str {
        &self.id
    }

    fn default_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("connectionId".into(), self.connection_id.as_str().into());
        tags.insert("threadId".into(), self.thread_id.as_str().into());
        tags.insert("role".into(), self.role.as_str().into());
        tags.insert("state".into(), self.state.as_str().into());
        tags.insert_opt(
            "recipientKeys",
            (!self.recipient_keys.is_empty()).then(|| self.recipient_keys.clone()),
        );
        tags
    }

    fn custom_tags(&self) -> &Tags {
        &self.tags
    }

    fn set_updated_at(&mut self, updated_at: DateTime<Utc>) {
        self.updated_at = Some(updated_at);
    }
}
