//! Public testimonial routes: listing, JSON feed, and the submission form.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppResult;
use crate::form::csrf::generate_csrf_token;
use crate::models::PublicTestimonial;
use crate::permissions::Actor;
use crate::state::AppState;
use crate::testimonial::display::EMPTY_LISTING_MESSAGE;
use crate::testimonial::submission::LOGIN_REQUIRED_MESSAGE;
use crate::testimonial::{SubmissionInput, SubmissionOutcome};

use super::helpers::{
    Message, current_actor, login_url, render_page, render_server_error, require_csrf,
};

const SUBMIT_PATH: &str = "/testimonials/submit";

/// Posted submission form.
#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(rename = "_token", default)]
    token: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    author_email: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    rating: String,
}

impl SubmitForm {
    fn input(&self) -> SubmissionInput {
        SubmissionInput {
            author_name: self.author_name.clone(),
            author_email: self.author_email.clone(),
            message: self.message.clone(),
            rating: self.rating.clone(),
        }
    }
}

/// Values placed back into the form fields.
#[derive(Debug, Default, Serialize)]
struct FormValues {
    author_name: String,
    author_email: String,
    message: String,
    rating: String,
}

/// Published testimonials as HTML cards.
///
/// GET /testimonials
async fn list_page(State(state): State<AppState>, session: Session) -> Response {
    let actor = current_actor(&state, &session).await;

    let cards = match state.testimonials().published_cards().await {
        Ok(cards) => cards,
        Err(e) => {
            tracing::error!(error = %e, "failed to load published testimonials");
            return render_server_error("Testimonials are unavailable right now.");
        }
    };

    let mut context = tera::Context::new();
    context.insert("cards", &cards);
    context.insert("empty_message", EMPTY_LISTING_MESSAGE);

    render_page(
        &state,
        &session,
        &actor,
        "testimonials/list.html",
        "Testimonials",
        Vec::new(),
        context,
    )
    .await
}

/// Published testimonials as JSON. Author emails are never included.
///
/// GET /api/testimonials
async fn list_json(State(state): State<AppState>) -> AppResult<Json<Vec<PublicTestimonial>>> {
    let published = state.testimonials().list_published().await?;
    Ok(Json(published.iter().map(PublicTestimonial::from).collect()))
}

/// Render the submission page for `actor`.
///
/// Anonymous actors get a login prompt instead of the form.
async fn render_submit_page(
    state: &AppState,
    session: &Session,
    actor: &Actor,
    status: StatusCode,
    messages: Vec<Message>,
) -> Response {
    let mut context = tera::Context::new();
    let settings = state.testimonials().settings();

    match actor.identity() {
        None => {
            context.insert("login_required", &true);
            context.insert("login_message", LOGIN_REQUIRED_MESSAGE);
            context.insert("login_url", &login_url(SUBMIT_PATH));
        }
        Some(identity) => {
            let csrf_token = match generate_csrf_token(session).await {
                Ok(token) => token,
                Err(e) => {
                    tracing::error!(error = %e, "failed to generate CSRF token");
                    return render_server_error("Failed to generate form token.");
                }
            };
            let values = FormValues {
                author_name: identity.name.clone(),
                author_email: identity.email.clone().unwrap_or_default(),
                ..FormValues::default()
            };
            let email_locked = settings.locked_email(identity.email.as_deref()).is_some();

            context.insert("login_required", &false);
            context.insert("csrf_token", &csrf_token);
            context.insert("values", &values);
            context.insert("email_locked", &email_locked);
            context.insert("message_max_length", &settings.message_max_length);
        }
    }

    let mut response = render_page(
        state,
        session,
        actor,
        "testimonials/submit.html",
        "Submit a testimonial",
        messages,
        context,
    )
    .await;
    if response.status().is_success() {
        *response.status_mut() = status;
    }
    response
}

/// Submission form.
///
/// GET /testimonials/submit
async fn submit_form(State(state): State<AppState>, session: Session) -> Response {
    let actor = current_actor(&state, &session).await;
    render_submit_page(&state, &session, &actor, StatusCode::OK, Vec::new()).await
}

/// Submission handler.
///
/// POST /testimonials/submit
async fn submit_form_post(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SubmitForm>,
) -> Response {
    let actor = current_actor(&state, &session).await;

    // Anonymous posts never carry a token; the workflow turns them away.
    if actor.is_authenticated() {
        if let Err(resp) = require_csrf(&session, &form.token).await {
            return resp;
        }
    }

    let outcome = state.testimonials().submit(&form.input(), &actor).await;
    state.metrics().record_submission(outcome.label());

    let (status, messages) = match &outcome {
        SubmissionOutcome::Submitted { .. } => (
            StatusCode::OK,
            outcome.messages().into_iter().map(Message::status).collect(),
        ),
        SubmissionOutcome::Invalid(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            outcome.messages().into_iter().map(Message::error).collect(),
        ),
        SubmissionOutcome::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            outcome.messages().into_iter().map(Message::error).collect(),
        ),
        // The page itself carries the login prompt.
        SubmissionOutcome::AuthenticationRequired => (StatusCode::UNAUTHORIZED, Vec::new()),
    };

    render_submit_page(&state, &session, &actor, status, messages).await
}

/// Create the public testimonial router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/testimonials", get(list_page))
        .route("/api/testimonials", get(list_json))
        .route(SUBMIT_PATH, get(submit_form).post(submit_form_post))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_form_maps_to_input() {
        let form = SubmitForm {
            token: "t".to_string(),
            author_name: "Ana".to_string(),
            author_email: "ana@x.com".to_string(),
            message: "Great".to_string(),
            rating: "5".to_string(),
        };
        let input = form.input();
        assert_eq!(input.author_name, "Ana");
        assert_eq!(input.rating, "5");
    }
}
