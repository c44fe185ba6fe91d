//! Shared route helpers for page rendering and access checks.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::form::csrf::verify_csrf_token;
use crate::models::User;
use crate::permissions::{Actor, MANAGE_TESTIMONIALS};
use crate::routes::auth::SESSION_USER_ID;
use crate::state::AppState;

/// Session key for messages carried across a redirect.
const SESSION_FLASH: &str = "flash_messages";

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Status,
    Error,
}

/// A message shown above page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

impl Message {
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Status,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

/// Queue a message for the next rendered page.
pub async fn push_flash(session: &Session, message: Message) {
    let mut messages: Vec<Message> = session
        .get(SESSION_FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    messages.push(message);
    if let Err(e) = session.insert(SESSION_FLASH, messages).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Take queued messages, leaving none behind.
pub async fn take_flash(session: &Session) -> Vec<Message> {
    session
        .remove::<Vec<Message>>(SESSION_FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// The logged-in, active user for this session, if any.
pub async fn current_user(state: &AppState, session: &Session) -> Option<User> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    let id = user_id?;

    match state.users().find_by_id(id).await {
        Ok(Some(user)) if user.is_active() => Some(user),
        Ok(_) => None,
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "failed to load session user");
            None
        }
    }
}

/// The actor making this request.
pub async fn current_actor(state: &AppState, session: &Session) -> Actor {
    match current_user(state, session).await {
        Some(user) => Actor::Authenticated(user.identity()),
        None => Actor::Anonymous,
    }
}

/// Login page URL that returns to `destination` afterwards.
pub fn login_url(destination: &str) -> String {
    format!("/user/login?destination={}", urlencoding::encode(destination))
}

/// Require an actor holding the moderation capability.
///
/// Anonymous visitors are redirected to the login page. Authenticated users
/// without the capability get 403 and no page content.
pub async fn require_manager(
    state: &AppState,
    session: &Session,
    destination: &str,
) -> Result<Actor, Response> {
    let actor = current_actor(state, session).await;
    if actor.has_capability(MANAGE_TESTIMONIALS) {
        return Ok(actor);
    }
    if actor.is_authenticated() {
        tracing::debug!(user_id = %actor.log_id(), "moderation page refused");
        return Err(render_forbidden());
    }
    Err(Redirect::to(&login_url(destination)).into_response())
}

/// Verify a submitted CSRF token, or produce a 403 response.
pub async fn require_csrf(session: &Session, token: &str) -> Result<(), Response> {
    match verify_csrf_token(session, token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(render_error_page(
            StatusCode::FORBIDDEN,
            "Invalid form token",
            "The form has expired. Please go back, reload the page, and try again.",
        )),
        Err(e) => {
            tracing::debug!(error = %e, "CSRF verification failed");
            Err(render_error_page(
                StatusCode::FORBIDDEN,
                "Invalid form token",
                "The form has expired. Please go back, reload the page, and try again.",
            ))
        }
    }
}

/// Render a page template with the shared layout context.
///
/// Adds `title`, `messages`, `user_authenticated`, and `can_manage`. Queued
/// flash messages are shown before `messages`.
pub async fn render_page(
    state: &AppState,
    session: &Session,
    actor: &Actor,
    template: &str,
    title: &str,
    messages: Vec<Message>,
    mut context: tera::Context,
) -> Response {
    let mut all = take_flash(session).await;
    all.extend(messages);

    context.insert("title", title);
    context.insert("messages", &all);
    context.insert("user_authenticated", &actor.is_authenticated());
    context.insert("can_manage", &actor.has_capability(MANAGE_TESTIMONIALS));

    match state.theme().render(template, &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, template = %template, "failed to render template");
            render_server_error("The page could not be rendered.")
        }
    }
}

/// Minimal standalone error page.
pub fn render_error_page(status: StatusCode, title: &str, message: &str) -> Response {
    let html = format!(
        r#"<!DOCTYPE html>
<html><head><title>{title}</title></head>
<body>
<div style="max-width: 600px; margin: 100px auto; text-align: center;">
<h1>{title}</h1>
<p>{message}</p>
<p><a href="/testimonials">Return to testimonials</a></p>
</div>
</body></html>"#,
        title = html_escape(title),
        message = html_escape(message),
    );
    (status, Html(html)).into_response()
}

pub fn render_not_found() -> Response {
    render_error_page(
        StatusCode::NOT_FOUND,
        "Not Found",
        "The requested testimonial could not be found.",
    )
}

pub fn render_forbidden() -> Response {
    render_error_page(
        StatusCode::FORBIDDEN,
        "Access denied",
        "You are not authorized to access this page.",
    )
}

pub fn render_server_error(message: &str) -> Response {
    render_error_page(StatusCode::INTERNAL_SERVER_ERROR, "Error", message)
}

/// HTML-escape a string for safe output.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
