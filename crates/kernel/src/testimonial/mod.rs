//! Testimonial workflows.
//!
//! This module provides:
//! - validate: field rules for submitted reviews
//! - submission: authenticated submission into the pending queue
//! - moderation: approve/reject of pending reviews and admin edits
//! - display: published listing and card formatting
//!
//! Every workflow goes through [`TestimonialService`], which owns the injected
//! [`ContentRepository`] and the submission settings.

pub mod display;
pub mod moderation;
pub mod submission;
pub mod validate;

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::content::{ContentRepository, ContentStatus, QueryOrder, RepositoryError};
use crate::models::{TESTIMONIAL_TYPE, Testimonial};

pub use display::{TestimonialCard, format_date, rating_glyphs};
pub use moderation::{ActionOutcome, ModerationAction, ModerationError, QueueRow};
pub use submission::{
    EmailFieldMode, SubmissionInput, SubmissionOutcome, SubmissionSettings,
};
pub use validate::{FieldError, ValidatedInput, validate};

/// Service for testimonial submission, moderation, and listing.
#[derive(Clone)]
pub struct TestimonialService {
    inner: Arc<TestimonialServiceInner>,
}

struct TestimonialServiceInner {
    repository: Arc<dyn ContentRepository>,
    settings: SubmissionSettings,
}

impl TestimonialService {
    /// Create a new testimonial service.
    pub fn new(repository: Arc<dyn ContentRepository>, settings: SubmissionSettings) -> Self {
        Self {
            inner: Arc::new(TestimonialServiceInner {
                repository,
                settings,
            }),
        }
    }

    /// Submission settings in effect.
    pub fn settings(&self) -> &SubmissionSettings {
        &self.inner.settings
    }

    pub(crate) fn repository(&self) -> &dyn ContentRepository {
        self.inner.repository.as_ref()
    }

    /// Whether the backing repository is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.repository().is_healthy().await
    }

    /// Load one testimonial regardless of status.
    pub(crate) async fn find(&self, id: Uuid) -> Result<Option<Testimonial>, RepositoryError> {
        match self.repository().find(id).await? {
            Some(record) if record.entity_type == TESTIMONIAL_TYPE => {
                Testimonial::from_record(record).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Load every testimonial in a status.
    ///
    /// Records that cannot be assembled are logged and skipped so one bad row
    /// does not take down a listing.
    pub(crate) async fn list_by_status(
        &self,
        status: ContentStatus,
        order: QueryOrder,
    ) -> Result<Vec<Testimonial>, RepositoryError> {
        let records = self
            .repository()
            .query(TESTIMONIAL_TYPE, status, order)
            .await?;

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match Testimonial::from_record(record) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        warn!(testimonial_id = %id, error = %e, "skipping unreadable testimonial");
                        None
                    }
                }
            })
            .collect())
    }
}
