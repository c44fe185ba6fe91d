//! Field validation for submitted testimonials.

use std::fmt;

use serde::Serialize;

use crate::content::sanitize;

/// Lowest accepted rating.
pub const MIN_RATING: i64 = 1;

/// Highest accepted rating.
pub const MAX_RATING: i64 = 5;

/// A single violated field rule.
///
/// Variants are declared in the order errors are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    NameRequired,
    EmailInvalid,
    MessageRequired,
    RatingOutOfRange,
}

impl FieldError {
    /// Message shown verbatim to the submitter.
    pub fn message(self) -> &'static str {
        match self {
            Self::NameRequired => "Name is required.",
            Self::EmailInvalid => "Valid email is required.",
            Self::MessageRequired => "Message is required.",
            Self::RatingOutOfRange => "Rating must be between 1 and 5.",
        }
    }

    /// Form field the error belongs to.
    pub fn field(self) -> &'static str {
        match self {
            Self::NameRequired => "author_name",
            Self::EmailInvalid => "author_email",
            Self::MessageRequired => "message",
            Self::RatingOutOfRange => "rating",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Sanitized values that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub rating: u8,
}

/// Validate a submission.
///
/// Values are sanitized first, then every rule is checked; all violations are
/// returned together, in declaration order of [`FieldError`].
pub fn validate(
    author_name: &str,
    author_email: &str,
    message: &str,
    rating: i64,
) -> Result<ValidatedInput, Vec<FieldError>> {
    let author_name = sanitize::text_field(author_name);
    let author_email = sanitize::email(author_email);
    let message = sanitize::textarea(message);

    let mut errors = Vec::new();
    if author_name.is_empty() {
        errors.push(FieldError::NameRequired);
    }
    if !is_valid_email(&author_email) {
        errors.push(FieldError::EmailInvalid);
    }
    if message.is_empty() {
        errors.push(FieldError::MessageRequired);
    }
    let rating = match u8::try_from(rating) {
        Ok(r) if (MIN_RATING..=MAX_RATING).contains(&i64::from(r)) => r,
        _ => {
            errors.push(FieldError::RatingOutOfRange);
            0
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedInput {
        author_name,
        author_email,
        message,
        rating,
    })
}

/// Check an address against the usual `local@domain.tld` grammar.
///
/// The local part allows the RFC 5322 atom characters plus dots. The domain
/// needs at least two dot-separated labels of letters, digits, and inner
/// hyphens.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 6 || email.len() > 254 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c))
    {
        return false;
    }

    if domain.contains("..") || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
