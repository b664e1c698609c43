//! # Storage Port
//!
//! The record store is an injected collaborator. It stores opaque JSON values
//! with tags, partitioned by agent context and record type.

use async_trait::async_trait;
use shared_types::AgentContext;

use crate::error::StorageResult;
use crate::query::{Query, QueryOptions};
use crate::record::Tags;

/// A record as the store sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub value: serde_json::Value,
    pub tags: Tags,
}

/// Keyed, query-capable record store.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Insert a new record. Fails if the id already exists.
    async fn save(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        record: StoredRecord,
    ) -> StorageResult<()>;

    /// Replace an existing record. Fails if the id does not exist.
    async fn update(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        record: StoredRecord,
    ) -> StorageResult<()>;

    /// Remove a record. Fails if the id does not exist.
    async fn delete(&self, ctx: &AgentContext, record_type: &str, id: &str) -> StorageResult<()>;

    /// Fetch by id.
    async fn get(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        id: &str,
    ) -> StorageResult<Option<StoredRecord>>;

    /// Records matching a tag query, in insertion order.
    async fn find(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        query: &Query,
        options: QueryOptions,
    ) -> StorageResult<Vec<StoredRecord>>;
}
