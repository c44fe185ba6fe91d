//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::content::RepositoryError;

/// Errors returned by handlers that answer with plain responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage error")]
    Repository(#[from] RepositoryError),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details are logged, never returned.
        match &self {
            AppError::Repository(e) => tracing::error!(error = %e, "repository error"),
        }

        (status, "internal server error").into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
