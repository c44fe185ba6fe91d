//! Testimonial entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::content::{ContentRecord, ContentStatus, RepositoryError};

/// Content type under which testimonials are stored.
pub const TESTIMONIAL_TYPE: &str = "testimonial";

/// Metadata keys attached to each testimonial record.
pub mod meta {
    pub const AUTHOR_NAME: &str = "author_name";
    pub const AUTHOR_EMAIL: &str = "author_email";
    pub const RATING: &str = "rating";
}

/// A submitted review.
///
/// Deliberately not `Serialize`: anything leaving the process goes through
/// [`PublicTestimonial`], which has no email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Testimonial {
    pub id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub rating: u8,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
}

impl Testimonial {
    /// Assemble a testimonial from a repository record and its metadata.
    ///
    /// A missing name falls back to the record title. A missing or malformed
    /// rating is reported as corrupt, since every write path validates it.
    pub fn from_record(record: ContentRecord) -> Result<Self, RepositoryError> {
        let rating = record
            .meta(meta::RATING)
            .and_then(|r| r.parse::<u8>().ok())
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| {
                RepositoryError::Corrupt(format!("testimonial {} has no valid rating", record.id))
            })?;

        let author_name = record
            .meta(meta::AUTHOR_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| record.title.clone());
        let author_email = record
            .meta(meta::AUTHOR_EMAIL)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            id: record.id,
            author_name,
            author_email,
            message: record.body,
            rating,
            status: record.status,
            created_at: record.created_at,
        })
    }
}

/// Public representation of a testimonial. Never carries the author email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicTestimonial {
    pub id: Uuid,
    pub author_name: String,
    pub message: String,
    pub rating: u8,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&Testimonial> for PublicTestimonial {
    fn from(t: &Testimonial) -> Self {
        Self {
            id: t.id,
            author_name: t.author_name.clone(),
            message: t.message.clone(),
            rating: t.rating,
            status: t.status,
            created_at: t.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn record(meta_pairs: &[(&str, &str)]) -> ContentRecord {
        ContentRecord {
            id: Uuid::now_v7(),
            entity_type: TESTIMONIAL_TYPE.to_string(),
            title: "Title Name".to_string(),
            body: "Great service".to_string(),
            status: ContentStatus::Pending,
            metadata: meta_pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn assembles_from_metadata() {
        let t = Testimonial::from_record(record(&[
            (meta::AUTHOR_NAME, "Ana"),
            (meta::AUTHOR_EMAIL, "ana@x.com"),
            (meta::RATING, "5"),
        ]))
        .unwrap();
        assert_eq!(t.author_name, "Ana");
        assert_eq!(t.author_email, "ana@x.com");
        assert_eq!(t.rating, 5);
        assert_eq!(t.message, "Great service");
    }

    #[test]
    fn name_falls_back_to_title() {
        let t = Testimonial::from_record(record(&[(meta::RATING, "3")])).unwrap();
        assert_eq!(t.author_name, "Title Name");
    }

    #[test]
    fn out_of_range_rating_is_corrupt() {
        for bad in ["0", "6", "x"] {
            let err = Testimonial::from_record(record(&[(meta::RATING, bad)])).unwrap_err();
            assert!(matches!(err, RepositoryError::Corrupt(_)));
        }
    }

    #[test]
    fn public_shape_has_no_email() {
        let t = Testimonial::from_record(record(&[
            (meta::AUTHOR_EMAIL, "secret@x.com"),
            (meta::RATING, "4"),
        ]))
        .unwrap();
        let json = serde_json::to_value(PublicTestimonial::from(&t)).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["author_name", "created_at", "id", "message", "rating", "status"]
        );
        assert!(!json.to_string().contains("secret@x.com"));
    }
}
