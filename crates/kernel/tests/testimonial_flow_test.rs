#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end testimonial workflows over HTTP: submit, moderate, display.

mod common;

use axum::http::StatusCode;

use common::{TestApp, body_string, location, merge_cookies};
use testimonials_kernel::content::{ContentFields, ContentRepository, ContentStatus, QueryOrder};
use testimonials_kernel::models::TESTIMONIAL_TYPE;
use testimonials_kernel::testimonial::SubmissionSettings;
use testimonials_test_utils::{Operation, RecordingRepository, form_body, test_submission};
use uuid::Uuid;

const SUBMIT: &str = "/testimonials/submit";
const QUEUE: &str = "/admin/testimonials";

/// Submit as a logged-in user and return the response status and page body.
async fn submit(app: &TestApp, cookies: &str, body: impl Fn(&str) -> String) -> (StatusCode, String) {
    let (cookies, token) = app.fetch_csrf_token(SUBMIT, cookies).await;
    let response = app.post_form(SUBMIT, &cookies, body(&token)).await;
    let status = response.status();
    (status, body_string(response).await)
}

async fn records(app: &TestApp, status: ContentStatus) -> Vec<Uuid> {
    app.repo
        .store()
        .query(TESTIMONIAL_TYPE, status, QueryOrder::Insertion)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

/// Post a moderation action from the queue page; returns the response.
async fn moderate(app: &TestApp, cookies: &str, id: Uuid, action: &str) -> axum::response::Response {
    let (cookies, token) = app.fetch_csrf_token(QUEUE, cookies).await;
    app.post_form(
        QUEUE,
        &cookies,
        form_body(&[
            ("_token", &token),
            ("testimonial_id", &id.to_string()),
            ("action", action),
        ]),
    )
    .await
}

#[tokio::test]
async fn submitted_testimonial_is_published_after_approval() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;

    let (status, html) = submit(&app, &ana, |t| {
        test_submission("Ana").with_message("Great service").form_body(t)
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Thank you! Your testimonial is submitted for review."));

    // Pending items stay out of the public listing.
    let listing = body_string(app.get("/testimonials", "").await).await;
    assert!(!listing.contains("Great service"));
    assert!(listing.contains("No testimonials available."));

    let admin = app.login_admin("admin").await;
    let queue = body_string(app.get(QUEUE, &admin).await).await;
    assert!(queue.contains("Ana"));
    assert!(queue.contains("Great service"));
    assert!(queue.contains("5/5"));

    let pending = records(&app, ContentStatus::Pending).await;
    assert_eq!(pending.len(), 1);

    let response = moderate(&app, &admin, pending[0], "approve").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), QUEUE);

    // The flash survives the redirect, and the queue is empty.
    let admin = merge_cookies(&admin, &response);
    let queue = body_string(app.get(QUEUE, &admin).await).await;
    assert!(queue.contains("Testimonial approved."));
    assert!(queue.contains("No pending testimonials."));

    let listing = body_string(app.get("/testimonials", "").await).await;
    assert!(listing.contains("Ana"));
    assert!(listing.contains("Great service"));
    assert!(listing.contains(&"\u{2B50}".repeat(5)));
    assert!(!listing.contains("ana@example.com"));
}

#[tokio::test]
async fn rejected_testimonial_is_discarded_and_never_listed() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;
    submit(&app, &ana, |t| test_submission("Ana").form_body(t)).await;

    let admin = app.login_admin("admin").await;
    let id = records(&app, ContentStatus::Pending).await[0];
    let response = moderate(&app, &admin, id, "reject").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert_eq!(records(&app, ContentStatus::Discarded).await, vec![id]);
    assert!(records(&app, ContentStatus::Pending).await.is_empty());

    // A discarded testimonial cannot be brought back.
    let response = moderate(&app, &admin, id, "approve").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(records(&app, ContentStatus::Published).await.is_empty());

    let listing = body_string(app.get("/testimonials", "").await).await;
    assert!(listing.contains("No testimonials available."));
}

#[tokio::test]
async fn invalid_submission_reports_every_error_and_stores_nothing() {
    let app = TestApp::editable_email();
    let ana = app.login_member("ana").await;

    let (status, html) = submit(&app, &ana, |t| {
        test_submission("   ")
            .with_email("not-an-email")
            .with_message("")
            .with_rating(9)
            .form_body(t)
    })
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(html.contains("Name is required."));
    assert!(html.contains("Valid email is required."));
    assert!(html.contains("Message is required."));
    assert!(html.contains("Rating must be between 1 and 5."));
    assert_eq!(app.repo.count(Operation::Create), 0);
}

#[tokio::test]
async fn locked_email_uses_the_account_address() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;

    let (cookies, token) = app.fetch_csrf_token(SUBMIT, &ana).await;
    let form = body_string(app.get(SUBMIT, &cookies).await).await;
    assert!(form.contains(r#"type="hidden" name="author_email""#));

    let response = app
        .post_form(
            SUBMIT,
            &cookies,
            test_submission("Ana").with_email("forged@evil.test").form_body(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let id = records(&app, ContentStatus::Pending).await[0];
    let email = app
        .repo
        .store()
        .get_metadata(id, "author_email")
        .await
        .unwrap();
    assert_eq!(email.as_deref(), Some("ana@example.com"));
}

#[tokio::test]
async fn malformed_account_email_stays_editable() {
    let app = TestApp::new();
    app.create_user("cy", "not-an-email", false).await;
    let cy = app.login("cy").await;

    let (cookies, token) = app.fetch_csrf_token(SUBMIT, &cy).await;
    let form = body_string(app.get(SUBMIT, &cookies).await).await;
    assert!(form.contains(r#"type="email" name="author_email""#));
    assert!(!form.contains(r#"type="hidden" name="author_email""#));

    let response = app
        .post_form(
            SUBMIT,
            &cookies,
            test_submission("Cy").with_email("cy@example.com").form_body(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let id = records(&app, ContentStatus::Pending).await[0];
    let email = app
        .repo
        .store()
        .get_metadata(id, "author_email")
        .await
        .unwrap();
    assert_eq!(email.as_deref(), Some("cy@example.com"));
}

#[tokio::test]
async fn anonymous_visitors_are_asked_to_log_in() {
    let app = TestApp::new();

    let response = app.get(SUBMIT, "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("You must be logged in to submit a testimonial."));
    assert!(html.contains("destination=%2Ftestimonials%2Fsubmit"));
    assert!(!html.contains("<form method=\"post\" action=\"/testimonials/submit\""));

    let response = app
        .post_form(SUBMIT, "", test_submission("Mallory").form_body(""))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.repo.count(Operation::Create), 0);
}

#[tokio::test]
async fn submission_without_csrf_token_is_refused() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;

    let response = app
        .post_form(SUBMIT, &ana, test_submission("Ana").form_body("bogus"))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.repo.count(Operation::Create), 0);
}

#[tokio::test]
async fn failed_metadata_write_discards_the_record() {
    let app = TestApp::with_repository(
        RecordingRepository::new().fail(Operation::SetMetadata),
        SubmissionSettings::default(),
    );
    let ana = app.login_member("ana").await;

    let (status, html) = submit(&app, &ana, |t| test_submission("Ana").form_body(t)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("Something went wrong. Please try again."));
    assert!(!html.contains("Thank you!"));

    assert_eq!(app.repo.count(Operation::SoftDelete), 1);
    assert_eq!(records(&app, ContentStatus::Discarded).await.len(), 1);

    app.repo.recover(Operation::SetMetadata);
    let admin = app.login_admin("admin").await;
    let queue = body_string(app.get(QUEUE, &admin).await).await;
    assert!(queue.contains("No pending testimonials."));
}

#[tokio::test]
async fn failed_create_reports_failure() {
    let app = TestApp::with_repository(
        RecordingRepository::new().fail(Operation::Create),
        SubmissionSettings::default(),
    );
    let ana = app.login_member("ana").await;

    let (status, html) = submit(&app, &ana, |t| test_submission("Ana").form_body(t)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("Something went wrong. Please try again."));
    assert_eq!(app.repo.count(Operation::SetMetadata), 0);
}

#[tokio::test]
async fn listing_escapes_markup_and_orders_newest_first() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;
    submit(&app, &ana, |t| {
        test_submission("Ana").with_message("first <b>bold</b>").form_body(t)
    })
    .await;
    submit(&app, &ana, |t| {
        test_submission("Ana").with_message("second").with_rating(3).form_body(t)
    })
    .await;

    let admin = app.login_admin("admin").await;
    for id in records(&app, ContentStatus::Pending).await {
        let response = moderate(&app, &admin, id, "approve").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let listing = body_string(app.get("/testimonials", "").await).await;
    assert!(!listing.contains("<b>bold</b>"));
    assert!(listing.find("second").unwrap() < listing.find("first").unwrap());
    assert!(listing.contains(&format!("{}{}", "\u{2B50}".repeat(3), "\u{2606}".repeat(2))));
}

#[tokio::test]
async fn json_feed_lists_published_testimonials_without_email() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;
    submit(&app, &ana, |t| test_submission("Ana").form_body(t)).await;

    let admin = app.login_admin("admin").await;
    let id = records(&app, ContentStatus::Pending).await[0];
    moderate(&app, &admin, id, "approve").await;

    let response = app.get("/api/testimonials", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["author_name"], "Ana");
    assert_eq!(items[0]["rating"], 5);
    assert!(items[0].get("author_email").is_none());
}

#[tokio::test]
async fn unknown_or_malformed_ids_are_not_found() {
    let app = TestApp::new();
    let admin = app.login_admin("admin").await;

    let response = moderate(&app, &admin, Uuid::now_v7(), "approve").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (cookies, token) = app.fetch_csrf_token(QUEUE, &admin).await;
    let response = app
        .post_form(
            QUEUE,
            &cookies,
            form_body(&[("_token", &token), ("testimonial_id", "nope"), ("action", "approve")]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unrecognized_action_leaves_status_alone() {
    let app = TestApp::new();
    let id = app
        .repo
        .store()
        .create(
            TESTIMONIAL_TYPE,
            ContentStatus::Pending,
            ContentFields {
                title: "Ana".to_string(),
                body: "Great".to_string(),
            },
        )
        .await
        .unwrap();
    app.repo.store().set_metadata(id, "rating", "4").await.unwrap();

    let admin = app.login_admin("admin").await;
    let response = moderate(&app, &admin, id, "publish").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(records(&app, ContentStatus::Pending).await, vec![id]);
    assert_eq!(app.repo.count(Operation::UpdateStatus), 0);
    assert_eq!(app.repo.count(Operation::SoftDelete), 0);
}

#[tokio::test]
async fn moderator_can_edit_details() {
    let app = TestApp::new();
    let ana = app.login_member("ana").await;
    submit(&app, &ana, |t| test_submission("Ana").with_message("Typo").form_body(t)).await;
    let id = records(&app, ContentStatus::Pending).await[0];
    let path = format!("/admin/testimonials/{id}/edit");

    let admin = app.login_admin("admin").await;
    let (cookies, token) = app.fetch_csrf_token(&path, &admin).await;
    let response = app
        .post_form(
            &path,
            &cookies,
            form_body(&[
                ("_token", &token),
                ("author_name", "Ana B."),
                ("author_email", "ana@example.com"),
                ("message", "Fixed"),
                ("rating", "4"),
            ]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let queue = body_string(app.get(QUEUE, &cookies).await).await;
    assert!(queue.contains("Testimonial updated."));
    assert!(queue.contains("Ana B."));
    assert!(queue.contains("Fixed"));
    assert!(queue.contains("4/5"));

    // Invalid edits re-render the form with the errors.
    let (cookies, token) = app.fetch_csrf_token(&path, &cookies).await;
    let response = app
        .post_form(
            &path,
            &cookies,
            form_body(&[
                ("_token", &token),
                ("author_name", "Ana B."),
                ("author_email", "ana@example.com"),
                ("message", "Fixed"),
                ("rating", "0"),
            ]),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_string(response).await.contains("Rating must be between 1 and 5."));
}
