//! # Generic Record Repository
//!
//! Typed access to the record store for one record type. Serialization and
//! tag projection happen here so services only deal with domain records.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use shared_types::AgentContext;
use tracing::trace;

use crate::error::{StorageError, StorageResult};
use crate::ports::{StorageService, StoredRecord};
use crate::query::{Query, QueryOptions};
use crate::record::Record;

/// Repository for records of type `T`.
pub struct Repository<T, S: ?Sized> {
    storage: Arc<S>,
    _record: PhantomData<fn() -> T>,
}

impl<T, S: ?Sized> Clone for Repository<T, S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            _record: PhantomData,
        }
    }
}

impl<T, S> Repository<T, S>
where
    T: Record,
    S: StorageService + ?Sized,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            _record: PhantomData,
        }
    }

    /// Persist a new record.
    pub async fn save(&self, ctx: &AgentContext, record: &T) -> StorageResult<()> {
        trace!(record_type = T::RECORD_TYPE, id = record.id(), "save");
        self.storage
            .save(ctx, T::RECORD_TYPE, to_stored(record)?)
            .await
    }

    /// Persist changes to an existing record, stamping `updated_at`.
    pub async fn update(&self, ctx: &AgentContext, record: &mut T) -> StorageResult<()> {
        trace!(record_type = T::RECORD_TYPE, id = record.id(), "update");
        record.set_updated_at(Utc::now());
        self.storage
            .update(ctx, T::RECORD_TYPE, to_stored(record)?)
            .await
    }

    pub async fn delete(&self, ctx: &AgentContext, record: &T) -> StorageResult<()> {
        self.delete_by_id(ctx, record.id()).await
    }

    pub async fn delete_by_id(&self, ctx: &AgentContext, id: &str) -> StorageResult<()> {
        self.storage.delete(ctx, T::RECORD_TYPE, id).await
    }

    pub async fn find_by_id(&self, ctx: &AgentContext, id: &str) -> StorageResult<Option<T>> {
        self.storage
            .get(ctx, T::RECORD_TYPE, id)
            .await?
            .map(|stored| from_stored(&stored))
            .transpose()
    }

    /// Like [`Self::find_by_id`] but a missing record is an error.
    pub async fn get_by_id(&self, ctx: &AgentContext, id: &str) -> StorageResult<T> {
        self.find_by_id(ctx, id)
            .await?
            .ok_or_else(|| StorageError::RecordNotFound {
                record_type: T::RECORD_TYPE.to_string(),
                id: id.to_string(),
            })
    }

    pub async fn find_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
        options: QueryOptions,
    ) -> StorageResult<Vec<T>> {
        self.storage
            .find(ctx, T::RECORD_TYPE, query, options)
            .await?
            .iter()
            .map(from_stored)
            .collect()
    }

    /// At most one record may match; several is a [`StorageError::RecordDuplicate`].
    pub async fn find_single_by_query(
        &self,
        ctx: &AgentContext,
        query: &Query,
    ) -> StorageResult<Option<T>> {
        let mut records = self
            .find_by_query(ctx, query, QueryOptions::default())
            .await?;
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            _ => Err(StorageError::RecordDuplicate {
                record_type: T::RECORD_TYPE.to_string(),
                query: query.to_string(),
            }),
        }
    }

    /// Exactly one record must match.
    pub async fn get_single_by_query(&self, ctx: &AgentContext, query: &Query) -> StorageResult<T> {
        self.find_single_by_query(ctx, query)
            .await?
            .ok_or_else(|| StorageError::RecordNotFound {
                record_type: T::RECORD_TYPE.to_string(),
                id: query.to_string(),
            })
    }

    pub async fn get_all(&self, ctx: &AgentContext) -> StorageResult<Vec<T>> {
        self.find_by_query(ctx, &Query::All, QueryOptions::default())
            .await
    }
}

fn to_stored<T: Record>(record: &T) -> StorageResult<StoredRecord> {
    Ok(StoredRecord {
        id: record.id().to_string(),
        value: serde_json::to_value(record).map_err(|e| StorageError::Serialization(e.to_string()))?,
        tags: record.tags(),
    })
}

fn from_stored<T: Record>(stored: &StoredRecord) -> StorageResult<T> {
    serde_json::from_value(stored.value.clone())
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStorageService;
    use crate::record::{Tags, TagsExt};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NoteRecord {
        id: String,
        connection_id: Option<String>,
        body: String,
        tags: Tags,
        updated_at: Option<DateTime<Utc>>,
    }

    impl NoteRecord {
        fn new(id: &str, connection_id: Option<&str>) -> Self {
            Self {
                id: id.into(),
                connection_id: connection_id.map(str::to_string),
                body: String::new(),
                tags: Tags::new(),
                updated_at: None,
            }
        }
    }

    impl Record for NoteRecord {
        const RECORD_TYPE: &'static str = "NoteRecord";

        fn id(&self) -> &str {
            &self.id
        }

        fn default_tags(&self) -> Tags {
            let mut tags = Tags::new();
            tags.insert_opt("connectionId", self.connection_id.clone());
            tags
        }

        fn custom_tags(&self) -> &Tags {
            &self.tags
        }

        fn set_updated_at(&mut self, updated_at: DateTime<Utc>) {
            self.updated_at = Some(updated_at);
        }
    }

    fn repository() -> Repository<NoteRecord, InMemoryStorageService> {
        Repository::new(Arc::new(InMemoryStorageService::new()))
    }

    #[tokio::test]
    async fn test_save_and_get_by_id() {
        let repo = repository();
        let ctx = AgentContext::default();
        let record = NoteRecord::new("n-1", Some("c-1"));

        repo.save(&ctx, &record).await.unwrap();
        assert_eq!(repo.get_by_id(&ctx, "n-1").await.unwrap(), record);
        assert!(matches!(
            repo.get_by_id(&ctx, "missing").await,
            Err(StorageError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let repo = repository();
        let ctx = AgentContext::default();
        let mut record = NoteRecord::new("n-1", None);
        repo.save(&ctx, &record).await.unwrap();

        record.body = "changed".into();
        repo.update(&ctx, &mut record).await.unwrap();

        let stored = repo.get_by_id(&ctx, "n-1").await.unwrap();
        assert_eq!(stored.body, "changed");
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_find_single_by_query_duplicate() {
        let repo = repository();
        let ctx = AgentContext::default();
        repo.save(&ctx, &NoteRecord::new("n-1", Some("c-1")))
            .await
            .unwrap();
        repo.save(&ctx, &NoteRecord::new("n-2", Some("c-1")))
            .await
            .unwrap();

        let query = Query::eq("connectionId", "c-1");
        assert!(matches!(
            repo.find_single_by_query(&ctx, &query).await,
            Err(StorageError::RecordDuplicate { .. })
        ));
        assert!(repo
            .find_single_by_query(&ctx, &Query::eq("connectionId", "c-2"))
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .get_single_by_query(&ctx, &Query::eq("connectionId", "c-2"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_custom_tags_are_queryable_but_default_tags_win() {
        let repo = repository();
        let ctx = AgentContext::default();
        let mut record = NoteRecord::new("n-1", Some("c-1"));
        record.tags.insert("topic".into(), "menus".into());
        record.tags.insert("connectionId".into(), "spoofed".into());
        repo.save(&ctx, &record).await.unwrap();

        assert_eq!(
            repo.find_by_query(&ctx, &Query::eq("topic", "menus"), QueryOptions::default())
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(repo
            .find_single_by_query(&ctx, &Query::eq("connectionId", "spoofed"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_and_get_all() {
        let repo = repository();
        let ctx = AgentContext::default();
        let record = NoteRecord::new("n-1", None);
        repo.save(&ctx, &record).await.unwrap();
        repo.save(&ctx, &NoteRecord::new("n-2", None)).await.unwrap();

        repo.delete(&ctx, &record).await.unwrap();
        let all = repo.get_all(&ctx).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "n-2");
    }
}
