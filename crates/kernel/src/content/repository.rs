//! Content repository abstraction.
//!
//! Every workflow reaches storage through [`ContentRepository`]. Records are
//! untyped: a title, a body, a status, and a bag of string metadata keyed per
//! record. Typed entities (testimonials) are assembled on top of this.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle status of a content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Awaiting moderation.
    Pending,
    /// Publicly visible.
    Published,
    /// Soft-deleted; kept in storage but hidden from every listing.
    Discarded,
}

impl ContentStatus {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Discarded => "discarded",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "discarded" => Ok(Self::Discarded),
            other => Err(RepositoryError::Corrupt(format!("unknown status '{other}'"))),
        }
    }
}

/// Ordering applied by [`ContentRepository::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrder {
    /// Oldest first, ties broken by identifier.
    Insertion,
    /// Most recently created first.
    NewestFirst,
}

/// Base fields of a content record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFields {
    pub title: String,
    pub body: String,
}

/// A content record as returned by queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: Uuid,
    pub entity_type: String,
    pub title: String,
    pub body: String,
    pub status: ContentStatus,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ContentRecord {
    /// Look up a metadata value.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("content {0} not found")]
    NotFound(Uuid),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt content record: {0}")]
    Corrupt(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Storage seam for content records.
///
/// Every call is expected to be atomic on its own; callers apply no locking
/// or transaction discipline around sequences of calls.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Create a record and return its newly assigned identifier.
    async fn create(
        &self,
        entity_type: &str,
        status: ContentStatus,
        fields: ContentFields,
    ) -> Result<Uuid, RepositoryError>;

    /// Replace the base fields and set several metadata values as one write.
    ///
    /// Either every change is stored or none is.
    async fn update_with_metadata(
        &self,
        id: Uuid,
        fields: ContentFields,
        metadata: &[(&str, &str)],
    ) -> Result<(), RepositoryError>;

    /// Set (insert or overwrite) one metadata value.
    async fn set_metadata(&self, id: Uuid, key: &str, value: &str) -> Result<(), RepositoryError>;

    /// Read one metadata value.
    async fn get_metadata(&self, id: Uuid, key: &str) -> Result<Option<String>, RepositoryError>;

    /// Load a single record with its metadata.
    async fn find(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError>;

    /// List every record of a type in the given status.
    async fn query(
        &self,
        entity_type: &str,
        status: ContentStatus,
        order: QueryOrder,
    ) -> Result<Vec<ContentRecord>, RepositoryError>;

    /// Move a record to a new status.
    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<(), RepositoryError>;

    /// Move a record to the recoverable trash.
    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Whether the backing store is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}
