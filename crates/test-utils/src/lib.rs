//! Testimonials test utilities.
//!
//! Helpers for integration testing: submission fixtures, identities, and a
//! content repository that records calls and fails on demand.

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use testimonials_kernel::content::{
    ContentFields, ContentRecord, ContentRepository, ContentStatus, MemoryContentRepository,
    QueryOrder, RepositoryError,
};
use testimonials_kernel::permissions::{Actor, Identity, MANAGE_TESTIMONIALS};
use testimonials_kernel::testimonial::SubmissionInput;

/// Create a valid submission with default values.
pub fn test_submission(author_name: &str) -> TestSubmission {
    TestSubmission {
        author_name: author_name.to_string(),
        author_email: format!("{}@example.com", author_name.to_lowercase().replace(' ', ".")),
        message: "Great service".to_string(),
        rating: "5".to_string(),
    }
}

/// A submission builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestSubmission {
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub rating: String,
}

impl TestSubmission {
    /// Set the email.
    pub fn with_email(mut self, email: &str) -> Self {
        self.author_email = email.to_string();
        self
    }

    /// Set the message.
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    /// Set the raw rating value.
    pub fn with_rating(mut self, rating: impl ToString) -> Self {
        self.rating = rating.to_string();
        self
    }

    /// Convert to workflow input.
    pub fn input(&self) -> SubmissionInput {
        SubmissionInput {
            author_name: self.author_name.clone(),
            author_email: self.author_email.clone(),
            message: self.message.clone(),
            rating: self.rating.clone(),
        }
    }

    /// URL-encoded form body, including the CSRF token.
    pub fn form_body(&self, csrf_token: &str) -> String {
        form_body(&[
            ("_token", csrf_token),
            ("author_name", &self.author_name),
            ("author_email", &self.author_email),
            ("message", &self.message),
            ("rating", &self.rating),
        ])
    }
}

/// Encode key/value pairs as `application/x-www-form-urlencoded`.
pub fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// An authenticated actor without moderation rights.
pub fn member(name: &str) -> Actor {
    Identity::new(Uuid::now_v7(), name)
        .with_email(format!("{name}@example.com"))
        .into()
}

/// An authenticated actor holding the moderation capability.
pub fn moderator(name: &str) -> Actor {
    Identity::new(Uuid::now_v7(), name)
        .with_capability(MANAGE_TESTIMONIALS)
        .into()
}

/// Repository operations that [`RecordingRepository`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    Create,
    Update,
    SetMetadata,
    GetMetadata,
    Find,
    Query,
    UpdateStatus,
    SoftDelete,
}

/// In-memory repository that logs every call and fails selected operations.
#[derive(Default)]
pub struct RecordingRepository {
    inner: MemoryContentRepository,
    calls: Mutex<Vec<Operation>>,
    failing: RwLock<BTreeSet<Operation>>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` return [`RepositoryError::Unavailable`] from now on.
    pub fn fail(self, op: Operation) -> Self {
        self.failing.write().insert(op);
        self
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: Operation) {
        self.failing.write().remove(&op);
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().clone()
    }

    /// How many times `op` was called.
    pub fn count(&self, op: Operation) -> usize {
        self.calls.lock().iter().filter(|&&c| c == op).count()
    }

    /// The backing store, bypassing recording and failures.
    pub fn store(&self) -> &MemoryContentRepository {
        &self.inner
    }

    fn enter(&self, op: Operation) -> Result<(), RepositoryError> {
        self.calls.lock().push(op);
        if self.failing.read().contains(&op) {
            return Err(RepositoryError::Unavailable(format!("{op:?} disabled for test")));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for RecordingRepository {
    async fn create(
        &self,
        entity_type: &str,
        status: ContentStatus,
        fields: ContentFields,
    ) -> Result<Uuid, RepositoryError> {
        self.enter(Operation::Create)?;
        self.inner.create(entity_type, status, fields).await
    }

    async fn update_with_metadata(
        &self,
        id: Uuid,
        fields: ContentFields,
        metadata: &[(&str, &str)],
    ) -> Result<(), RepositoryError> {
        self.enter(Operation::Update)?;
        // A failing metadata write aborts the whole update.
        if !metadata.is_empty() {
            self.enter(Operation::SetMetadata)?;
        }
        self.inner.update_with_metadata(id, fields, metadata).await
    }

    async fn set_metadata(&self, id: Uuid, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.enter(Operation::SetMetadata)?;
        self.inner.set_metadata(id, key, value).await
    }

    async fn get_metadata(&self, id: Uuid, key: &str) -> Result<Option<String>, RepositoryError> {
        self.enter(Operation::GetMetadata)?;
        self.inner.get_metadata(id, key).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<ContentRecord>, RepositoryError> {
        self.enter(Operation::Find)?;
        self.inner.find(id).await
    }

    async fn query(
        &self,
        entity_type: &str,
        status: ContentStatus,
        order: QueryOrder,
    ) -> Result<Vec<ContentRecord>, RepositoryError> {
        self.enter(Operation::Query)?;
        self.inner.query(entity_type, status, order).await
    }

    async fn update_status(&self, id: Uuid, status: ContentStatus) -> Result<(), RepositoryError> {
        self.enter(Operation::UpdateStatus)?;
        self.inner.update_status(id, status).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.enter(Operation::SoftDelete)?;
        self.inner.soft_delete(id).await
    }

    async fn is_healthy(&self) -> bool {
        !self.failing.read().contains(&Operation::Query)
    }
}
