//! In-memory content repository.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::repository::{
    ContentFields, ContentRecord, ContentRepository, ContentStatus, QueryOrder, RepositoryError,
};

/// Content repository held entirely in process memory.
///
/// Records are kept in insertion order, which is what
/// [`QueryOrder::Insertion`] returns.
#[derive(Default)]
pub struct MemoryContentRepository {
    records: RwLock<Vec<ContentRecord>>,
}

impl MemoryContentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across every type and status.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the repository holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn with_record<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ContentRecord) -> T,
    ) -> Result<T, RepositoryError> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        Ok(f(record))
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn create(
        &self,
        entity_type: &str,
        status: ContentStatus,
        fields: ContentFields,
    ) -> Result<Uuid, RepositoryError> {
        let id = Uuid::now_v7();
        self.records.write().push(ContentRecord {
            id,
            entity_type: entity_type.to_string(),
            title: fields.title,
            body: fields.body,
            status,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        });
        debug!(%id, entity_type, %status, "content created");
        Ok(id)
    }

    async fn update_with_metadata(
        &self,
        id: Uuid,
        fields: ContentFields,
        metadata: &[(&str, &str)],
    ) -> Result<(), RepositoryError> {
        self.with_record(id, |record| {
            record.title = fields.title;
            record.body = fields.body;
            for (key, value) in metadata {
                record.metadata.insert((*key).to_string(), (*value).to_string());
            }
        })?;
        debug!(%id, keys = metadata.len(), "content updated");
        Ok(())
    }

    async fn set_metadata(&self, id: Uuid, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.with_record(id, |record| {
            record.metadata.insert(key.to_string(), value.to_string());
        })
    }

    async fn get_metadata(&self, id: Uuid, key: &str) -> Result<Option<String>, RepositoryError> {
        let records = self.records.read();
        Ok(records
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| r.metadata.get(key).cloned()))
    }

    async fn find(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn query(
        &self,
        entity_type: &str,
        status: ContentStatus,
        order: QueryOrder,
    ) -> Result<Vec<ContentRecord>, RepositoryError> {
        let mut matched: Vec<ContentRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| r.entity_type == entity_type && r.status == status)
            .cloned()
            .collect();

        if order == QueryOrder::NewestFirst {
            // Reverse first so records sharing a timestamp keep newest-inserted first.
            matched.reverse();
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        Ok(matched)
    }

    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<(), RepositoryError> {
        self.with_record(id, |record| record.status = status)?;
        debug!(%id, %status, "content status updated");
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.with_record(id, |record| record.status = ContentStatus::Discarded)?;
        debug!(%id, "content moved to trash");
        Ok(())
    }
}
