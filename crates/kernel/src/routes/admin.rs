//! Moderation routes: pending queue, approve/reject, and testimonial edits.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::form::csrf::generate_csrf_token;
use crate::models::Testimonial;
use crate::permissions::Actor;
use crate::state::AppState;
use crate::testimonial::{ActionOutcome, ModerationAction, ModerationError, QueueRow};

use super::helpers::{
    Message, push_flash, render_forbidden, render_not_found, render_page, render_server_error,
    require_csrf, require_manager,
};

const QUEUE_PATH: &str = "/admin/testimonials";

/// Shown when the pending queue is empty.
pub const EMPTY_QUEUE_MESSAGE: &str = "No pending testimonials.";

/// Posted moderation action.
#[derive(Debug, Deserialize)]
struct ModerationForm {
    #[serde(rename = "_token", default)]
    token: String,
    #[serde(default)]
    testimonial_id: String,
    #[serde(default)]
    action: String,
}

/// Posted edit form.
#[derive(Debug, Deserialize, Serialize)]
struct EditForm {
    #[serde(rename = "_token", default, skip_serializing)]
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

impl From<&Testimonial> for EditForm {
    fn from(t: &Testimonial) -> Self {
        Self {
            token: String::new(),
            author_name: t.author_name.clone(),
            author_email: t.author_email.clone(),
            message: t.message.clone(),
            rating: t.rating.to_string(),
        }
    }
}

/// Map a moderation failure to a response, logging storage errors.
fn moderation_error_response(e: ModerationError, context: &str) -> Response {
    match e {
        ModerationError::AuthorizationDenied => render_forbidden(),
        ModerationError::NotFound(_) => render_not_found(),
        ModerationError::Invalid(_) => {
            render_server_error("The testimonial details were not accepted.")
        }
        ModerationError::Repository(e) => {
            tracing::error!(error = %e, "{context}");
            render_server_error("Something went wrong. Please try again.")
        }
    }
}

/// Pending testimonial queue.
///
/// GET /admin/testimonials
async fn queue(State(state): State<AppState>, session: Session) -> Response {
    let actor = match require_manager(&state, &session, QUEUE_PATH).await {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    let pending = match state.testimonials().list_pending(&actor).await {
        Ok(pending) => pending,
        Err(e) => return moderation_error_response(e, "failed to load pending testimonials"),
    };
    let rows: Vec<QueueRow> = pending.iter().map(QueueRow::from).collect();

    let csrf_token = match generate_csrf_token(&session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to generate CSRF token");
            return render_server_error("Failed to generate form token.");
        }
    };

    let mut context = tera::Context::new();
    context.insert("rows", &rows);
    context.insert("csrf_token", &csrf_token);
    context.insert("empty_message", EMPTY_QUEUE_MESSAGE);

    render_page(
        &state,
        &session,
        &actor,
        "admin/testimonials.html",
        "Pending Testimonials",
        Vec::new(),
        context,
    )
    .await
}

/// Apply approve/reject, then return to the queue.
///
/// POST /admin/testimonials
async fn queue_action(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ModerationForm>,
) -> Response {
    let actor = match require_manager(&state, &session, QUEUE_PATH).await {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let Ok(id) = form.testimonial_id.trim().parse::<Uuid>() else {
        return render_not_found();
    };

    let action = ModerationAction::parse(&form.action);
    let outcome = match state.testimonials().apply_action(&actor, id, &action).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.metrics().record_moderation(action.label(), "error");
            return moderation_error_response(e, "failed to apply moderation action");
        }
    };

    let (label, message) = match outcome {
        ActionOutcome::Approved => ("approved", Some("Testimonial approved.")),
        ActionOutcome::Rejected => ("rejected", Some("Testimonial rejected.")),
        ActionOutcome::Unchanged => ("unchanged", None),
    };
    state.metrics().record_moderation(action.label(), label);
    if let Some(message) = message {
        push_flash(&session, Message::status(message)).await;
    }

    // 303 so a reload re-reads the queue instead of re-posting.
    Redirect::to(QUEUE_PATH).into_response()
}

async fn render_edit(
    state: &AppState,
    session: &Session,
    actor: &Actor,
    testimonial: &Testimonial,
    values: &EditForm,
    status: StatusCode,
    messages: Vec<Message>,
) -> Response {
    let csrf_token = match generate_csrf_token(session).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to generate CSRF token");
            return render_server_error("Failed to generate form token.");
        }
    };

    let mut context = tera::Context::new();
    context.insert("id", &testimonial.id);
    context.insert("status", testimonial.status.as_str());
    context.insert("values", values);
    context.insert("csrf_token", &csrf_token);

    let mut response = render_page(
        state,
        session,
        actor,
        "admin/testimonial-edit.html",
        "Edit testimonial",
        messages,
        context,
    )
    .await;
    if response.status().is_success() {
        *response.status_mut() = status;
    }
    response
}

/// Edit form for one testimonial.
///
/// GET /admin/testimonials/{id}/edit
async fn edit_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    let destination = format!("{QUEUE_PATH}/{id}/edit");
    let actor = match require_manager(&state, &session, &destination).await {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    let testimonial = match state.testimonials().get_for_edit(&actor, id).await {
        Ok(t) => t,
        Err(e) => return moderation_error_response(e, "failed to load testimonial"),
    };

    let values = EditForm::from(&testimonial);
    render_edit(
        &state,
        &session,
        &actor,
        &testimonial,
        &values,
        StatusCode::OK,
        Vec::new(),
    )
    .await
}

/// Save edited details.
///
/// POST /admin/testimonials/{id}/edit
async fn edit_form_submit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Form(form): Form<EditForm>,
) -> Response {
    let destination = format!("{QUEUE_PATH}/{id}/edit");
    let actor = match require_manager(&state, &session, &destination).await {
        Ok(actor) => actor,
        Err(resp) => return resp,
    };

    if let Err(resp) = require_csrf(&session, &form.token).await {
        return resp;
    }

    let result = state
        .testimonials()
        .update_details(
            &actor,
            id,
            &form.author_name,
            &form.author_email,
            &form.message,
            &form.rating,
        )
        .await;

    match result {
        Ok(_) => {
            push_flash(&session, Message::status("Testimonial updated.")).await;
            Redirect::to(QUEUE_PATH).into_response()
        }
        Err(ModerationError::Invalid(errors)) => {
            let testimonial = match state.testimonials().get_for_edit(&actor, id).await {
                Ok(t) => t,
                Err(e) => return moderation_error_response(e, "failed to reload testimonial"),
            };
            let messages = errors.iter().map(|e| Message::error(e.message())).collect();
            render_edit(
                &state,
                &session,
                &actor,
                &testimonial,
                &form,
                StatusCode::UNPROCESSABLE_ENTITY,
                messages,
            )
            .await
        }
        Err(e) => moderation_error_response(e, "failed to update testimonial"),
    }
}

/// Create the moderation router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(QUEUE_PATH, get(queue).post(queue_action))
        .route(
            "/admin/testimonials/{id}/edit",
            get(edit_form).post(edit_form_submit),
        )
}
