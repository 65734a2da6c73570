use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::completion::CompletionError;
use crate::github::GitHubError;
use crate::protocol::FileAccessError;

/// Error body: `{"success": false, "error": "...", "details": {...}}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    File {
        status: StatusCode,
        error: FileAccessError,
    },
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// File errors as reported by the content and save routes: all 400 except
    /// unexpected I/O failures
    pub fn file(error: FileAccessError) -> Self {
        let status = match error {
            FileAccessError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::File { status, error }
    }

    /// Like [`ApiError::file`] but a missing target is 404
    pub fn file_with_not_found(error: FileAccessError) -> Self {
        match error {
            FileAccessError::NotFound { .. } => ApiError::File {
                status: StatusCode::NOT_FOUND,
                error,
            },
            other => Self::file(other),
        }
    }
}

impl From<GitHubError> for ApiError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::InvalidUrl(_) | GitHubError::Git { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            GitHubError::Io(_) | GitHubError::Http(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        ApiError::Internal(format!("Failed to process message: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": message }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": message }),
            ),
            ApiError::File { status, error } => (
                status,
                json!({ "success": false, "error": error.to_string(), "details": error }),
            ),
            ApiError::Internal(message) => {
                tracing::error!("{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": message }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
