#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] drives the real router and real workflows, backed by the
//! in-memory repository, user directory, and session store. Each test builds
//! its own app, so tests share no state.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_sessions::cookie::SameSite;

use testimonials_kernel::AppState;
use testimonials_kernel::content::ContentRepository;
use testimonials_kernel::models::{CreateUser, MemoryUserDirectory, User};
use testimonials_kernel::testimonial::{EmailFieldMode, SubmissionSettings};
use testimonials_kernel::theme::ThemeEngine;
use testimonials_kernel::{routes, session};
use testimonials_test_utils::{RecordingRepository, form_body};

/// Password given to every test account.
pub const PASSWORD: &str = "correct horse battery staple";

/// Test application wrapper using the real kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub repo: Arc<RecordingRepository>,
}

impl TestApp {
    /// App with default settings over a fresh repository.
    pub fn new() -> Self {
        Self::with_repository(RecordingRepository::new(), SubmissionSettings::default())
    }

    /// App with an editable email field.
    pub fn editable_email() -> Self {
        Self::with_repository(
            RecordingRepository::new(),
            SubmissionSettings {
                email_field: EmailFieldMode::Editable,
                ..SubmissionSettings::default()
            },
        )
    }

    /// App over a caller-configured repository.
    pub fn with_repository(repo: RecordingRepository, settings: SubmissionSettings) -> Self {
        let repo = Arc::new(repo);
        let state = AppState::from_parts(
            repo.clone() as Arc<dyn ContentRepository>,
            Arc::new(MemoryUserDirectory::new()),
            settings,
            ThemeEngine::builtin().expect("built-in templates compile"),
        );
        let router = routes::app(
            state.clone(),
            session::create_memory_session_layer(SameSite::Strict, false),
        );
        Self {
            router,
            state,
            repo,
        }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// GET `path` with the given cookies.
    pub async fn get(&self, path: &str, cookies: &str) -> Response {
        let mut request = Request::get(path);
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies);
        }
        self.request(request.body(Body::empty()).unwrap()).await
    }

    /// POST a URL-encoded form to `path` with the given cookies.
    pub async fn post_form(&self, path: &str, cookies: &str, body: String) -> Response {
        let mut request =
            Request::post(path).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies);
        }
        self.request(request.body(Body::from(body)).unwrap()).await
    }

    /// GET a form page and return the refreshed cookies with its CSRF token.
    pub async fn fetch_csrf_token(&self, path: &str, cookies: &str) -> (String, String) {
        let response = self.get(path, cookies).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path} failed");
        let cookies = merge_cookies(cookies, &response);
        let html = body_string(response).await;
        let token = extract_csrf_token(&html).expect("form should carry a CSRF token");
        (cookies, token)
    }

    /// Create an account directly in the user directory.
    pub async fn create_user(&self, name: &str, email: &str, is_admin: bool) -> User {
        self.state
            .users()
            .create(CreateUser {
                name: name.to_string(),
                password: PASSWORD.to_string(),
                mail: email.to_string(),
                is_admin,
            })
            .await
            .expect("Failed to create test user")
    }

    /// Log in through the HTML form and return session cookies.
    pub async fn login(&self, name: &str) -> String {
        let (cookies, token) = self.fetch_csrf_token("/user/login", "").await;
        let response = self
            .post_form(
                "/user/login",
                &cookies,
                form_body(&[
                    ("_token", &token),
                    ("username", name),
                    ("password", PASSWORD),
                    ("destination", "/testimonials"),
                ]),
            )
            .await;
        assert_eq!(
            response.status(),
            StatusCode::SEE_OTHER,
            "Login failed for user '{name}'"
        );
        merge_cookies(&cookies, &response)
    }

    /// Create a member account and log in.
    pub async fn login_member(&self, name: &str) -> String {
        self.create_user(name, &format!("{name}@example.com"), false)
            .await;
        self.login(name).await
    }

    /// Create an administrator account and log in.
    pub async fn login_admin(&self, name: &str) -> String {
        self.create_user(name, &format!("{name}@example.com"), true)
            .await;
        self.login(name).await
    }
}

/// Collect a response body as a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body is UTF-8")
}

/// Cookies for the next request: the response's Set-Cookie values, or the
/// previous cookies when it set none.
pub fn merge_cookies(previous: &str, response: &Response) -> String {
    let fresh = extract_cookies(response);
    if fresh.is_empty() {
        previous.to_string()
    } else {
        fresh
    }
}

/// Extract Set-Cookie headers from a response for use in subsequent requests.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Find the page's CSRF token: the first `_token` hidden input, or the
/// `csrf-token` meta tag on pages without a form.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    [r#"name="_token" value=""#, r#"name="csrf-token" content=""#]
        .iter()
        .find_map(|pattern| {
            let start = html.find(pattern)? + pattern.len();
            let end = html[start..].find('"')?;
            Some(html[start..start + end].to_string())
        })
}

/// Location header of a redirect.
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
