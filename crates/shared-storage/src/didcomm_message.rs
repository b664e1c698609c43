//! # DIDComm Message Records
//!
//! Protocol services keep a copy of every message they send or receive,
//! linked to the exchange record, so later steps can read the previous
//! message (e.g. the offer when building a request).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{generate_id, AgentContext, AgentMessage, PlaintextMessage};

use crate::error::{StorageError, StorageResult};
use crate::ports::StorageService;
use crate::query::Query;
use crate::record::{Record, Tags, TagsExt};
use crate::repository::Repository;

/// Whether we sent or received the stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DidCommMessageRole {
    Sender,
    Receiver,
}

impl DidCommMessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

/// A stored plaintext message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCommMessageRecord {
    pub id: String,
    pub message: serde_json::Value,
    pub role: DidCommMessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_record_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Tags,
}

impl DidCommMessageRecord {
    pub fn new(
        message: &PlaintextMessage,
        role: DidCommMessageRole,
        associated_record_id: Option<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            message: message.as_value().clone(),
            role,
            associated_record_id,
            created_at: Utc::now(),
            updated_at: None,
            tags: Tags::new(),
        }
    }

    fn plaintext(&self) -> StorageResult<PlaintextMessage> {
        PlaintextMessage::from_value(self.message.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Typed view of the stored message.
    pub fn to_agent_message<M: AgentMessage>(&self) -> StorageResult<M> {
        self.plaintext()?
            .to_typed::<M>()
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

impl Record for DidCommMessageRecord {
    const RECORD_TYPE: &'static str = "DidCommMessageRecord";

    fn id(&self) -> &str {
        &self.id
    }

    fn default_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("role".into(), self.role.as_str().into());
        tags.insert_opt("associatedRecordId", self.associated_record_id.clone());

        if let Ok(plaintext) = self.plaintext() {
            tags.insert("messageId".into(), plaintext.id().into());
            tags.insert("threadId".into(), plaintext.thread_id().into());
            if let Ok(parsed) = plaintext.parsed_type() {
                tags.insert("protocolName".into(), parsed.protocol_name.into());
                tags.insert("messageName".into(), parsed.message_name.into());
                tags.insert("protocolMajorVersion".into(), parsed.major_version.into());
                tags.insert("protocolMinorVersion".into(), parsed.minor_version.into());
            }
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

fn message_query<M: AgentMessage>(associated_record_id: &str) -> Query {
    Query::and(vec![
        Query::eq("associatedRecordId", associated_record_id),
        Query::eq("protocolName", M::TYPE.protocol_name),
        Query::eq("messageName", M::TYPE.message_name),
        Query::eq("protocolMajorVersion", M::TYPE.major_version()),
    ])
}

/// Repository of stored DIDComm messages.
pub struct DidCommMessageRepository<S: ?Sized> {
    inner: Repository<DidCommMessageRecord, S>,
}

impl<S: ?Sized> Clone for DidCommMessageRepository<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: StorageService + ?Sized> DidCommMessageRepository<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            inner: Repository::new(storage),
        }
    }

    /// Store a message as a new record.
    pub async fn save_agent_message<M: AgentMessage>(
        &self,
        ctx: &AgentContext,
        message: &M,
        role: DidCommMessageRole,
        associated_record_id: &str,
    ) -> StorageResult<()> {
        let plaintext = message
            .to_plaintext()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let record =
            DidCommMessageRecord::new(&plaintext, role, Some(associated_record_id.to_string()));
        self.inner.save(ctx, &record).await
    }

    /// Replace the stored message of this type for the record, or store it.
    pub async fn save_or_update_agent_message<M: AgentMessage>(
        &self,
        ctx: &AgentContext,
        message: &M,
        role: DidCommMessageRole,
        associated_record_id: &str,
    ) -> StorageResult<()> {
        let existing = self
            .inner
            .find_single_by_query(ctx, &message_query::<M>(associated_record_id))
            .await?;

        match existing {
            Some(mut record) => {
                record.message = message
                    .to_plaintext()
                    .map_err(|e| StorageError::Serialization(e.to_string()))?
                    .as_value()
                    .clone();
                record.role = role;
                self.inner.update(ctx, &mut record).await
            }
            None => {
                self.save_agent_message(ctx, message, role, associated_record_id)
                    .await
            }
        }
    }

    /// The stored message of type `M` for a record, optionally by role.
    pub async fn find_agent_message<M: AgentMessage>(
        &self,
        ctx: &AgentContext,
        associated_record_id: &str,
        role: Option<DidCommMessageRole>,
    ) -> StorageResult<Option<M>> {
        let mut clauses = vec![message_query::<M>(associated_record_id)];
        clauses.push(Query::eq_opt("role", role.map(|r| r.as_str())));

        self.inner
            .find_single_by_query(ctx, &Query::and(clauses))
            .await?
            .map(|record| record.to_agent_message::<M>())
            .transpose()
    }

    /// Like [`Self::find_agent_message`] but a missing message is an error.
    pub async fn get_agent_message<M: AgentMessage>(
        &self,
        ctx: &AgentContext,
        associated_record_id: &str,
        role: Option<DidCommMessageRole>,
    ) -> StorageResult<M> {
        self.find_agent_message(ctx, associated_record_id, role)
            .await?
            .ok_or_else(|| StorageError::RecordNotFound {
                record_type: DidCommMessageRecord::RECORD_TYPE.to_string(),
                id: format!("{} for {}", M::TYPE.uri(), associated_record_id),
            })
    }

    /// Every stored message linked to a record.
    pub async fn find_by_associated_record(
        &self,
        ctx: &AgentContext,
        associated_record_id: &str,
    ) -> StorageResult<Vec<DidCommMessageRecord>> {
        self.inner
            .find_by_query(
                ctx,
                &Query::eq("associatedRecordId", associated_record_id),
                Default::default(),
            )
            .await
    }

    /// Delete every stored message linked to a record.
    pub async fn delete_by_associated_record(
        &self,
        ctx: &AgentContext,
        associated_record_id: &str,
    ) -> StorageResult<usize> {
        let records = self
            .find_by_associated_record(ctx, associated_record_id)
            .await?;
        for record in &records {
            self.inner.delete(ctx, record).await?;
        }
        Ok(records.len())
    }
}
