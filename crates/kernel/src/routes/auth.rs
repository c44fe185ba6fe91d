//! Authentication routes (login, logout).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::form::csrf::generate_csrf_token;
use crate::permissions::Actor;
use crate::state::AppState;

use super::helpers::{Message, render_page, render_server_error, require_csrf};

/// Session key for storing the authenticated user ID.
pub const SESSION_USER_ID: &str = "user_id";

/// Where users land after logging in or out without a destination.
const DEFAULT_DESTINATION: &str = "/testimonials";

/// Typed login error for explicit status code mapping.
#[derive(Debug)]
enum LoginError {
    /// Invalid credentials: wrong username or password (401).
    InvalidCredentials,
    /// Internal server error: directory failure, session store, etc. (500).
    Internal,
}

impl LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            LoginError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            LoginError::InvalidCredentials => "Invalid username or password",
            LoginError::Internal => "Internal server error",
        }
    }
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Query string accepted by the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub destination: Option<String>,
}

/// Form-based login request.
#[derive(Debug, Deserialize)]
pub struct LoginFormRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(rename = "_token", default)]
    pub csrf_token: String,
}

/// Accept only same-site relative paths as post-login destinations.
fn safe_destination(destination: Option<&str>) -> &str {
    match destination {
        Some(d) if d.starts_with('/') && !d.starts_with("//") && !d.contains('\\') => d,
        _ => DEFAULT_DESTINATION,
    }
}

async fn render_login(
    state: &AppState,
    session: &Session,
    destination: &str,
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
    context.insert("csrf_token", &csrf_token);
    context.insert("destination", destination);

    let mut response = render_page(
        state,
        session,
        &Actor::Anonymous,
        "user/login.html",
        "Log in",
        messages,
        context,
    )
    .await;
    if response.status().is_success() {
        *response.status_mut() = status;
    }
    response
}

/// Login form handler.
///
/// GET /user/login
async fn login_form(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    let destination = safe_destination(query.destination.as_deref());
    render_login(&state, &session, destination, StatusCode::OK, Vec::new()).await
}

/// Form-based login handler.
///
/// POST /user/login
async fn login_form_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginFormRequest>,
) -> Response {
    if let Err(resp) = require_csrf(&session, &form.csrf_token).await {
        return resp;
    }

    let destination = safe_destination(form.destination.as_deref()).to_string();

    match do_login(&state, &session, &form.username, &form.password).await {
        Ok(()) => Redirect::to(&destination).into_response(),
        Err(e) => {
            render_login(
                &state,
                &session,
                &destination,
                e.status_code(),
                vec![Message::error(e.message())],
            )
            .await
        }
    }
}

/// Perform login and return typed error on failure.
async fn do_login(
    state: &AppState,
    session: &Session,
    username: &str,
    password: &str,
) -> Result<(), LoginError> {
    let user = match state.users().find_by_name(username.trim()).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(LoginError::InvalidCredentials),
        Err(e) => {
            tracing::error!(error = %e, "user lookup failed during login");
            return Err(LoginError::Internal);
        }
    };

    if !user.is_active() || !user.verify_password(password) {
        return Err(LoginError::InvalidCredentials);
    }

    // New session ID on privilege change.
    session.cycle_id().await.map_err(|e| {
        tracing::error!(error = %e, "failed to cycle session id");
        LoginError::Internal
    })?;

    session
        .insert(SESSION_USER_ID, user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to insert user_id into session");
            LoginError::Internal
        })?;

    info!(user_id = %user.id, "user logged in");
    Ok(())
}

/// Logout handler.
///
/// GET /user/logout
async fn logout(session: Session) -> Response {
    let user_id: Option<uuid::Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();

    if let Err(e) = session.delete().await {
        tracing::error!(error = %e, "failed to delete session");
        return render_server_error("Failed to log out.");
    }

    if let Some(uid) = user_id {
        info!(user_id = %uid, "user logged out");
    }

    Redirect::to(DEFAULT_DESTINATION).into_response()
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/login", get(login_form).post(login_form_submit))
        .route("/user/logout", get(logout))
}
