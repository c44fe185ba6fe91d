#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Moderation workflow against a repository that fails on demand.

use std::sync::Arc;

use testimonials_kernel::content::{ContentFields, ContentRepository, ContentStatus};
use testimonials_kernel::models::TESTIMONIAL_TYPE;
use testimonials_kernel::testimonial::{ModerationError, SubmissionSettings, TestimonialService};
use testimonials_test_utils::{Operation, RecordingRepository, moderator};
use uuid::Uuid;

/// Store a pending "Ana / Original / 4" testimonial, bypassing the recorder.
async fn seed(repo: &RecordingRepository) -> Uuid {
    let store = repo.store();
    let id = store
        .create(
            TESTIMONIAL_TYPE,
            ContentStatus::Pending,
            ContentFields {
                title: "Ana".to_string(),
                body: "Original".to_string(),
            },
        )
        .await
        .unwrap();
    store.set_metadata(id, "author_name", "Ana").await.unwrap();
    store
        .set_metadata(id, "author_email", "ana@example.com")
        .await
        .unwrap();
    store.set_metadata(id, "rating", "4").await.unwrap();
    id
}

fn service(repo: &Arc<RecordingRepository>) -> TestimonialService {
    TestimonialService::new(repo.clone(), SubmissionSettings::default())
}

#[tokio::test]
async fn failed_edit_leaves_the_record_untouched() {
    let repo = Arc::new(RecordingRepository::new().fail(Operation::SetMetadata));
    let id = seed(&repo).await;

    let result = service(&repo)
        .update_details(
            &moderator("mod"),
            id,
            "Bo",
            "bo@example.com",
            "Rewritten",
            "2",
        )
        .await;
    assert!(matches!(result, Err(ModerationError::Repository(_))));

    let record = repo.store().find(id).await.unwrap().unwrap();
    assert_eq!(record.title, "Ana");
    assert_eq!(record.body, "Original");
    assert_eq!(record.meta("author_name"), Some("Ana"));
    assert_eq!(record.meta("author_email"), Some("ana@example.com"));
    assert_eq!(record.meta("rating"), Some("4"));
}

#[tokio::test]
async fn edit_writes_fields_and_metadata_together() {
    let repo = Arc::new(RecordingRepository::new());
    let id = seed(&repo).await;

    let updated = service(&repo)
        .update_details(
            &moderator("mod"),
            id,
            "Bo",
            "bo@example.com",
            "Rewritten",
            "2",
        )
        .await
        .unwrap();
    assert_eq!(updated.author_name, "Bo");
    assert_eq!(updated.message, "Rewritten");
    assert_eq!(updated.rating, 2);
    assert_eq!(updated.status, ContentStatus::Pending);
    assert_eq!(repo.count(Operation::Update), 1);
}

#[tokio::test]
async fn invalid_edit_never_reaches_the_repository() {
    let repo = Arc::new(RecordingRepository::new());
    let id = seed(&repo).await;

    let result = service(&repo)
        .update_details(&moderator("mod"), id, "", "bad", "", "0")
        .await;
    let Err(ModerationError::Invalid(errors)) = result else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 4);
    assert_eq!(repo.count(Operation::Update), 0);
}
