//! Submission of new testimonials into the moderation queue.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::content::{ContentFields, ContentStatus, sanitize};
use crate::models::TESTIMONIAL_TYPE;
use crate::models::testimonial::meta;
use crate::permissions::Actor;

use super::TestimonialService;
use super::validate::{FieldError, is_valid_email, validate};

/// Shown after a testimonial is stored for review.
pub const SUBMITTED_MESSAGE: &str = "Thank you! Your testimonial is submitted for review.";

/// Shown when storage rejects a submission.
pub const FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Shown to anonymous visitors instead of the form.
pub const LOGIN_REQUIRED_MESSAGE: &str = "You must be logged in to submit a testimonial.";

/// Where the author email comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailFieldMode {
    /// The account email is used and the form field is hidden.
    #[default]
    Locked,
    /// The author types an email into a visible field.
    Editable,
}

impl FromStr for EmailFieldMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "locked" => Ok(Self::Locked),
            "editable" => Ok(Self::Editable),
            other => anyhow::bail!("unknown email field mode '{other}' (expected locked or editable)"),
        }
    }
}

/// Settings for the submission form and workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionSettings {
    pub email_field: EmailFieldMode,
    /// `maxlength` rendered on the message field. Not enforced server-side.
    pub message_max_length: usize,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            email_field: EmailFieldMode::Locked,
            message_max_length: 500,
        }
    }
}

impl SubmissionSettings {
    /// The account email that replaces the posted one, if any.
    ///
    /// Only a well-formed account email is locked in; otherwise the author
    /// types one like in [`EmailFieldMode::Editable`].
    pub fn locked_email<'a>(&self, account_email: Option<&'a str>) -> Option<&'a str> {
        match (self.email_field, account_email) {
            (EmailFieldMode::Locked, Some(email)) if is_valid_email(email) => Some(email),
            _ => None,
        }
    }
}

/// Raw values posted by the submission form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionInput {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub message: String,
    /// Unparsed rating; non-numeric input counts as 0.
    #[serde(default)]
    pub rating: String,
}

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The actor is anonymous; nothing was validated or stored.
    AuthenticationRequired,
    /// One or more field rules failed; nothing was stored.
    Invalid(Vec<FieldError>),
    /// Storage rejected the write; nothing is left visible.
    Failed,
    /// Stored as pending.
    Submitted { id: Uuid },
}

impl SubmissionOutcome {
    /// User-facing messages for this outcome, in display order.
    pub fn messages(&self) -> Vec<&'static str> {
        match self {
            Self::AuthenticationRequired => vec![LOGIN_REQUIRED_MESSAGE],
            Self::Invalid(errors) => errors.iter().map(|e| e.message()).collect(),
            Self::Failed => vec![FAILURE_MESSAGE],
            Self::Submitted { .. } => vec![SUBMITTED_MESSAGE],
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::Invalid(_) => "invalid",
            Self::Failed => "failed",
            Self::Submitted { .. } => "submitted",
        }
    }
}

impl TestimonialService {
    /// Submit a testimonial on behalf of `actor`.
    ///
    /// Anonymous actors are turned away before validation. With
    /// [`EmailFieldMode::Locked`] the account email replaces whatever was
    /// posted, so the stored address is the one that gets validated.
    pub async fn submit(&self, input: &SubmissionInput, actor: &Actor) -> SubmissionOutcome {
        let Some(identity) = actor.identity() else {
            debug!("anonymous submission turned away");
            return SubmissionOutcome::AuthenticationRequired;
        };

        let email = self
            .settings()
            .locked_email(identity.email.as_deref())
            .unwrap_or(input.author_email.as_str());

        let validated = match validate(
            &input.author_name,
            email,
            &input.message,
            sanitize::integer(&input.rating),
        ) {
            Ok(v) => v,
            Err(errors) => {
                debug!(user_id = %identity.id, errors = errors.len(), "submission rejected by validation");
                return SubmissionOutcome::Invalid(errors);
            }
        };

        let fields = ContentFields {
            title: validated.author_name.clone(),
            body: validated.message.clone(),
        };

        let id = match self
            .repository()
            .create(TESTIMONIAL_TYPE, ContentStatus::Pending, fields)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!(user_id = %identity.id, error = %e, "failed to create testimonial");
                return SubmissionOutcome::Failed;
            }
        };

        let rating = validated.rating.to_string();
        let metadata = [
            (meta::AUTHOR_NAME, validated.author_name.as_str()),
            (meta::AUTHOR_EMAIL, validated.author_email.as_str()),
            (meta::RATING, rating.as_str()),
        ];

        for (key, value) in metadata {
            if let Err(e) = self.repository().set_metadata(id, key, value).await {
                error!(testimonial_id = %id, key, error = %e, "failed to attach testimonial metadata");
                // Pull the half-written record out of every listing.
                if let Err(e) = self.repository().soft_delete(id).await {
                    error!(testimonial_id = %id, error = %e, "failed to discard incomplete testimonial");
                }
                return SubmissionOutcome::Failed;
            }
        }

        info!(testimonial_id = %id, user_id = %identity.id, "testimonial submitted for review");
        SubmissionOutcome::Submitted { id }
    }
}
