//! Moderation queue: pending listing, approve/reject, and admin edits.
//!
//! Every entry point checks [`MANAGE_TESTIMONIALS`] before touching storage.
//! After a successful [`TestimonialService::apply_action`] callers must
//! re-read the queue with [`TestimonialService::list_pending`] instead of
//! patching what they already rendered.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::content::{ContentFields, ContentStatus, QueryOrder, RepositoryError, sanitize};
use crate::models::Testimonial;
use crate::models::testimonial::meta;
use crate::permissions::{Actor, MANAGE_TESTIMONIALS};

use super::TestimonialService;
use super::validate::{FieldError, validate};

/// Words of the message shown per queue row.
pub const QUEUE_EXCERPT_WORDS: usize = 15;

/// A moderator's requested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
    /// Anything else that was posted. Applying it changes nothing.
    Unrecognized(String),
}

impl ModerationAction {
    /// Parse a posted action value. Matching is exact after trimming.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "approve" => Self::Approve,
            "reject" => Self::Reject,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// What an applied action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Pending moved to published.
    Approved,
    /// Pending moved to discarded.
    Rejected,
    /// Nothing changed: unrecognized action, or the testimonial had already
    /// left the pending state.
    Unchanged,
}

/// Moderation errors.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("access denied")]
    AuthorizationDenied,

    #[error("testimonial {0} not found")]
    NotFound(Uuid),

    #[error("invalid testimonial details")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One row of the moderation queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueRow {
    pub id: Uuid,
    pub author_name: String,
    pub excerpt: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

impl From<&Testimonial> for QueueRow {
    fn from(t: &Testimonial) -> Self {
        Self {
            id: t.id,
            author_name: t.author_name.clone(),
            excerpt: trim_words(&t.message, QUEUE_EXCERPT_WORDS),
            rating: t.rating,
            created_at: t.created_at,
        }
    }
}

/// Keep the first `limit` words, appending an ellipsis when anything was cut.
pub fn trim_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return words.join(" ");
    }
    format!("{}\u{2026}", words[..limit].join(" "))
}

impl TestimonialService {
    fn authorize(actor: &Actor) -> Result<(), ModerationError> {
        if actor.has_capability(MANAGE_TESTIMONIALS) {
            Ok(())
        } else {
            debug!(user_id = %actor.log_id(), "moderation access denied");
            Err(ModerationError::AuthorizationDenied)
        }
    }

    /// Every pending testimonial, oldest first.
    pub async fn list_pending(&self, actor: &Actor) -> Result<Vec<Testimonial>, ModerationError> {
        Self::authorize(actor)?;
        Ok(self
            .list_by_status(ContentStatus::Pending, QueryOrder::Insertion)
            .await?)
    }

    /// Load a single testimonial for the admin edit form.
    pub async fn get_for_edit(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<Testimonial, ModerationError> {
        Self::authorize(actor)?;
        self.find(id).await?.ok_or(ModerationError::NotFound(id))
    }

    /// Apply a moderation action to a testimonial.
    ///
    /// Only pending testimonials move. Approving something already published
    /// or acting on something discarded is an idempotent no-op.
    pub async fn apply_action(
        &self,
        actor: &Actor,
        id: Uuid,
        action: &ModerationAction,
    ) -> Result<ActionOutcome, ModerationError> {
        Self::authorize(actor)?;

        if let ModerationAction::Unrecognized(raw) = action {
            debug!(testimonial_id = %id, action = %raw, "ignoring unrecognized moderation action");
            return Ok(ActionOutcome::Unchanged);
        }

        let testimonial = self.find(id).await?.ok_or(ModerationError::NotFound(id))?;

        let outcome = match (action, testimonial.status) {
            (ModerationAction::Approve, ContentStatus::Pending) => {
                self.repository()
                    .update_status(id, ContentStatus::Published)
                    .await?;
                ActionOutcome::Approved
            }
            (ModerationAction::Reject, ContentStatus::Pending) => {
                self.repository().soft_delete(id).await?;
                ActionOutcome::Rejected
            }
            (_, status) => {
                debug!(testimonial_id = %id, %status, "testimonial is not pending, leaving as is");
                ActionOutcome::Unchanged
            }
        };

        info!(
            testimonial_id = %id,
            user_id = %actor.log_id(),
            action = action.label(),
            outcome = ?outcome,
            "moderation action applied"
        );
        Ok(outcome)
    }

    /// Replace the author details and message of an existing testimonial.
    ///
    /// Runs the same validation as public submissions. Status is untouched.
    pub async fn update_details(
        &self,
        actor: &Actor,
        id: Uuid,
        author_name: &str,
        author_email: &str,
        message: &str,
        rating: &str,
    ) -> Result<Testimonial, ModerationError> {
        Self::authorize(actor)?;

        if self.find(id).await?.is_none() {
            return Err(ModerationError::NotFound(id));
        }

        let validated = validate(author_name, author_email, message, sanitize::integer(rating))
            .map_err(ModerationError::Invalid)?;

        let rating = validated.rating.to_string();
        self.repository()
            .update_with_metadata(
                id,
                ContentFields {
                    title: validated.author_name.clone(),
                    body: validated.message.clone(),
                },
                &[
                    (meta::AUTHOR_NAME, validated.author_name.as_str()),
                    (meta::AUTHOR_EMAIL, validated.author_email.as_str()),
                    (meta::RATING, rating.as_str()),
                ],
            )
            .await?;

        info!(testimonial_id = %id, user_id = %actor.log_id(), "testimonial details updated");
        self.find(id).await?.ok_or(ModerationError::NotFound(id))
    }
}
