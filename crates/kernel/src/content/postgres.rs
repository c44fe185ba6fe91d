//! PostgreSQL content repository.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::repository::{
    ContentFields, ContentRecord, ContentRepository, ContentStatus, QueryOrder, RepositoryError,
};

/// Row shape of the `content` table.
#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    entity_type: String,
    title: String,
    body: String,
    status: String,
    created: DateTime<Utc>,
}

/// Row shape of the `content_meta` table.
#[derive(Debug, sqlx::FromRow)]
struct MetaRow {
    content_id: Uuid,
    meta_key: String,
    meta_value: String,
}

impl ContentRow {
    fn into_record(self, metadata: BTreeMap<String, String>) -> Result<ContentRecord, RepositoryError> {
        Ok(ContentRecord {
            id: self.id,
            entity_type: self.entity_type,
            title: self.title,
            body: self.body,
            status: self.status.parse()?,
            metadata,
            created_at: self.created,
        })
    }
}

/// Content repository backed by the `content` and `content_meta` tables.
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Create a repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fail with `NotFound` when an UPDATE touched nothing.
    fn expect_row(id: Uuid, rows_affected: u64) -> Result<(), RepositoryError> {
        if rows_affected == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn load_metadata(
        &self,
        ids: &[Uuid],
    ) -> Result<BTreeMap<Uuid, BTreeMap<String, String>>, RepositoryError> {
        let rows = sqlx::query_as::<_, MetaRow>(
            "SELECT content_id, meta_key, meta_value FROM content_meta WHERE content_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<Uuid, BTreeMap<String, String>> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.content_id)
                .or_default()
                .insert(row.meta_key, row.meta_value);
        }
        Ok(grouped)
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn create(
        &self,
        entity_type: &str,
        status: ContentStatus,
        fields: ContentFields,
    ) -> Result<Uuid, RepositoryError> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO content (id, entity_type, title, body, status, created, changed)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(entity_type)
        .bind(&fields.title)
        .bind(&fields.body)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        debug!(%id, entity_type, %status, "content created");
        Ok(id)
    }

    async fn update_with_metadata(
        &self,
        id: Uuid,
        fields: ContentFields,
        metadata: &[(&str, &str)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE content SET title = $1, body = $2, changed = NOW() WHERE id = $3")
                .bind(&fields.title)
                .bind(&fields.body)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        // Dropping `tx` without commit rolls back.
        Self::expect_row(id, result.rows_affected())?;

        for (key, value) in metadata {
            sqlx::query(
                r#"
                INSERT INTO content_meta (content_id, meta_key, meta_value)
                VALUES ($1, $2, $3)
                ON CONFLICT (content_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
                "#,
            )
            .bind(id)
            .bind(*key)
            .bind(*value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(%id, keys = metadata.len(), "content updated");
        Ok(())
    }

    async fn set_metadata(&self, id: Uuid, key: &str, value: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO content_meta (content_id, meta_key, meta_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (content_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
            "#,
        )
        .bind(id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(RepositoryError::NotFound(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_metadata(&self, id: Uuid, key: &str) -> Result<Option<String>, RepositoryError> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT meta_value FROM content_meta WHERE content_id = $1 AND meta_key = $2",
        )
        .bind(id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ContentRow>(
            "SELECT id, entity_type, title, body, status, created FROM content WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut metadata = self.load_metadata(&[id]).await?;
        let record = row.into_record(metadata.remove(&id).unwrap_or_default())?;
        Ok(Some(record))
    }

    async fn query(
        &self,
        entity_type: &str,
        status: ContentStatus,
        order: QueryOrder,
    ) -> Result<Vec<ContentRecord>, RepositoryError> {
        let order_by = match order {
            QueryOrder::Insertion => "created ASC, id ASC",
            QueryOrder::NewestFirst => "created DESC, id DESC",
        };

        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT id, entity_type, title, body, status, created FROM content \
             WHERE entity_type = $1 AND status = $2 ORDER BY {order_by}"
        ))
        .bind(entity_type)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut metadata = self.load_metadata(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let meta = metadata.remove(&row.id).unwrap_or_default();
                row.into_record(meta)
            })
            .collect()
    }

    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE content SET status = $1, changed = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Self::expect_row(id, result.rows_affected())?;
        debug!(%id, %status, "content status updated");
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE content SET status = $1, discarded_at = NOW(), changed = NOW() WHERE id = $2",
        )
        .bind(ContentStatus::Discarded.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Self::expect_row(id, result.rows_affected())?;
        debug!(%id, "content moved to trash");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}
