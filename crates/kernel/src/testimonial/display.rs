//! Published listing and read-only card formatting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::content::{ContentStatus, QueryOrder, RepositoryError};
use crate::models::Testimonial;

use super::TestimonialService;
use super::validate::MAX_RATING;

/// Filled rating glyph.
pub const FILLED_GLYPH: char = '\u{2B50}';

/// Empty rating glyph.
pub const EMPTY_GLYPH: char = '\u{2606}';

/// Shown instead of an empty listing.
pub const EMPTY_LISTING_MESSAGE: &str = "No testimonials available.";

/// Render a rating as exactly five glyphs, `rating` of them filled.
///
/// Out-of-range ratings are clamped so the width never changes.
pub fn rating_glyphs(rating: u8) -> String {
    let slots = MAX_RATING as usize;
    let filled = usize::from(rating).min(slots);
    std::iter::repeat_n(FILLED_GLYPH, filled)
        .chain(std::iter::repeat_n(EMPTY_GLYPH, slots - filled))
        .collect()
}

/// Format a timestamp as "Month D, YYYY".
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Display-ready view of a published testimonial.
///
/// Values are plain text; the template layer escapes them. The author email
/// has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestimonialCard {
    pub id: Uuid,
    pub author_name: String,
    pub date: String,
    pub message: String,
    pub rating: u8,
    pub stars: String,
}

impl From<&Testimonial> for TestimonialCard {
    fn from(t: &Testimonial) -> Self {
        Self {
            id: t.id,
            author_name: t.author_name.clone(),
            date: format_date(&t.created_at),
            message: t.message.clone(),
            rating: t.rating,
            stars: rating_glyphs(t.rating),
        }
    }
}

impl TestimonialService {
    /// Every published testimonial, newest first.
    pub async fn list_published(&self) -> Result<Vec<Testimonial>, RepositoryError> {
        self.list_by_status(ContentStatus::Published, QueryOrder::NewestFirst)
            .await
    }

    /// Published testimonials as display cards.
    pub async fn published_cards(&self) -> Result<Vec<TestimonialCard>, RepositoryError> {
        Ok(self
            .list_published()
            .await?
            .iter()
            .map(TestimonialCard::from)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::content::{ContentFields, ContentRepository, MemoryContentRepository};
    use crate::models::TESTIMONIAL_TYPE;
    use crate::models::testimonial::meta;
    use crate::testimonial::SubmissionSettings;

    #[test]
    fn glyphs_are_always_five() {
        for rating in 0..=7u8 {
            let glyphs = rating_glyphs(rating);
            assert_eq!(glyphs.chars().count(), 5, "rating {rating}");
            let filled = glyphs.chars().filter(|&c| c == FILLED_GLYPH).count();
            assert_eq!(filled, usize::from(rating.min(5)));
        }
        assert_eq!(rating_glyphs(3), "\u{2B50}\u{2B50}\u{2B50}\u{2606}\u{2606}");
    }

    #[test]
    fn dates_use_month_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 15, 4, 0).unwrap();
        assert_eq!(format_date(&at), "March 7, 2024");
    }

    #[test]
    fn card_omits_email() {
        let t = Testimonial {
            id: Uuid::nil(),
            author_name: "Ana".to_string(),
            author_email: "ana@x.com".to_string(),
            message: "<b>Great</b>".to_string(),
            rating: 5,
            status: ContentStatus::Published,
            created_at: Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap(),
        };
        let card = TestimonialCard::from(&t);
        assert_eq!(card.date, "December 25, 2024");
        assert_eq!(card.stars.chars().filter(|&c| c == FILLED_GLYPH).count(), 5);
        let json = serde_json::to_string(&card).unwrap();
        assert!(!json.contains("ana@x.com"));
    }

    async fn insert(repo: &MemoryContentRepository, name: &str, status: ContentStatus) -> Uuid {
        let id = repo
            .create(
                TESTIMONIAL_TYPE,
                status,
                ContentFields {
                    title: name.to_string(),
                    body: "msg".to_string(),
                },
            )
            .await
            .unwrap();
        repo.set_metadata(id, meta::AUTHOR_NAME, name).await.unwrap();
        repo.set_metadata(id, meta::AUTHOR_EMAIL, "a@x.com").await.unwrap();
        repo.set_metadata(id, meta::RATING, "4").await.unwrap();
        id
    }

    #[tokio::test]
    async fn only_published_are_listed_newest_first() {
        let repo = Arc::new(MemoryContentRepository::new());
        let old = insert(&repo, "Old", ContentStatus::Published).await;
        insert(&repo, "Waiting", ContentStatus::Pending).await;
        insert(&repo, "Gone", ContentStatus::Discarded).await;
        let new = insert(&repo, "New", ContentStatus::Published).await;

        let service = TestimonialService::new(repo, SubmissionSettings::default());
        let ids: Vec<Uuid> = service
            .list_published()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![new, old]);
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped() {
        let repo = Arc::new(MemoryContentRepository::new());
        let good = insert(&repo, "Good", ContentStatus::Published).await;
        let bad = insert(&repo, "Bad", ContentStatus::Published).await;
        repo.set_metadata(bad, meta::RATING, "11").await.unwrap();

        let service = TestimonialService::new(repo, SubmissionSettings::default());
        let cards = service.published_cards().await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, good);
    }
}
