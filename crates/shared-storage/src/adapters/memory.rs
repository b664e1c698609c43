use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::AgentContext;

use crate::error::{StorageError, StorageResult};
use crate::ports::{StorageService, StoredRecord};
use crate::query::{Query, QueryOptions};

type Category = (String, String);

/// In-memory record store.
///
/// Records are partitioned by `(context, record type)` and kept in insertion
/// order. Used by tests and by agents that do not need persistence.
#[derive(Default)]
pub struct InMemoryStorageService {
    data: RwLock<HashMap<Category, Vec<StoredRecord>>>,
    saves: AtomicU64,
    updates: AtomicU64,
}

impl InMemoryStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Number of successful `update` calls.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Number of stored records of a type in a context.
    pub fn count(&self, ctx: &AgentContext, record_type: &str) -> usize {
        self.data
            .read()
            .get(&category(ctx, record_type))
            .map_or(0, Vec::len)
    }
}

fn category(ctx: &AgentContext, record_type: &str) -> Category {
    (ctx.context_correlation_id.clone(), record_type.to_string())
}

#[async_trait]
impl StorageService for InMemoryStorageService {
    async fn save(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        record: StoredRecord,
    ) -> StorageResult<()> {
        let mut data = self.data.write();
        let records = data.entry(category(ctx, record_type)).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StorageError::RecordAlreadyExists {
                record_type: record_type.to_string(),
                id: record.id,
            });
        }
        records.push(record);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        record: StoredRecord,
    ) -> StorageResult<()> {
        let mut data = self.data.write();
        let existing = data
            .get_mut(&category(ctx, record_type))
            .and_then(|records| records.iter_mut().find(|r| r.id == record.id))
            .ok_or_else(|| StorageError::RecordNotFound {
                record_type: record_type.to_string(),
                id: record.id.clone(),
            })?;
        *existing = record;
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, ctx: &AgentContext, record_type: &str, id: &str) -> StorageResult<()> {
        let mut data = self.data.write();
        let records = data.get_mut(&category(ctx, record_type));
        let position = records
            .as_ref()
            .and_then(|records| records.iter().position(|r| r.id == id));
        match (records, position) {
            (Some(records), Some(position)) => {
                records.remove(position);
                Ok(())
            }
            _ => Err(StorageError::RecordNotFound {
                record_type: record_type.to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn get(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        id: &str,
    ) -> StorageResult<Option<StoredRecord>> {
        Ok(self
            .data
            .read()
            .get(&category(ctx, record_type))
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn find(
        &self,
        ctx: &AgentContext,
        record_type: &str,
        query: &Query,
        options: QueryOptions,
    ) -> StorageResult<Vec<StoredRecord>> {
        let matching: Vec<StoredRecord> = self
            .data
            .read()
            .get(&category(ctx, record_type))
            .map(|records| {
                records
                    .iter()
                    .filter(|r| query.matches(&r.tags))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(options.apply(matching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Tags;

    fn stored(id: &str, role: &str) -> StoredRecord {
        let mut tags = Tags::new();
        tags.insert("role".into(), role.into());
        StoredRecord {
            id: id.into(),
            value: serde_json::json!({ "id": id }),
            tags,
        }
    }

    #[tokio::test]
    async fn test_save_get_update_delete() {
        let store = InMemoryStorageService::new();
        let ctx = AgentContext::default();

        store.save(&ctx, "T", stored("1", "a")).await.unwrap();
        assert!(store.get(&ctx, "T", "1").await.unwrap().is_some());

        store.update(&ctx, "T", stored("1", "b")).await.unwrap();
        let found = store
            .find(&ctx, "T", &Query::eq("role", "b"), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!((store.saves(), store.updates()), (1, 1));

        store.delete(&ctx, "T", "1").await.unwrap();
        assert!(store.get(&ctx, "T", "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_save_and_missing_update_fail() {
        let store = InMemoryStorageService::new();
        let ctx = AgentContext::default();

        store.save(&ctx, "T", stored("1", "a")).await.unwrap();
        assert!(matches!(
            store.save(&ctx, "T", stored("1", "a")).await,
            Err(StorageError::RecordAlreadyExists { .. })
        ));
        assert!(matches!(
            store.update(&ctx, "T", stored("2", "a")).await,
            Err(StorageError::RecordNotFound { .. })
        ));
        assert!(matches!(
            store.delete(&ctx, "T", "2").await,
            Err(StorageError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let store = InMemoryStorageService::new();
        let tenant_a = AgentContext::new("a");
        let tenant_b = AgentContext::new("b");

        store.save(&tenant_a, "T", stored("1", "x")).await.unwrap();

        assert!(store.get(&tenant_b, "T", "1").await.unwrap().is_none());
        assert_eq!(store.count(&tenant_a, "T"), 1);
        assert_eq!(store.count(&tenant_b, "T"), 0);
    }

    #[tokio::test]
    async fn test_find_preserves_insertion_order() {
        let store = InMemoryStorageService::new();
        let ctx = AgentContext::default();
        for id in ["c", "a", "b"] {
            store.save(&ctx, "T", stored(id, "r")).await.unwrap();
        }

        let ids: Vec<String> = store
            .find(&ctx, "T", &Query::All, QueryOptions::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
