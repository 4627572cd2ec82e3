use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{picture_store::PictureError, spot_service::SpotError};

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 422 Unprocessable Entity (validation failures)
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthenticated.")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "request failed: {}", self.message);
        }

        let body = Json(json!({
            "message": self.message,
            "data": null
        }));

        (self.status, body).into_response()
    }
}

impl From<PictureError> for AppError {
    fn from(err: PictureError) -> Self {
        match err {
            PictureError::UnsupportedType(_) | PictureError::Empty => {
                AppError::validation(err.to_string())
            }
            PictureError::NotFound(_) | PictureError::InvalidPath => {
                AppError::not_found(err.to_string())
            }
            PictureError::Io(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<SpotError> for AppError {
    fn from(err: SpotError) -> Self {
        match err {
            SpotError::NotFound(_) => AppError::not_found(err.to_string()),
            SpotError::Forbidden => AppError::forbidden(err.to_string()),
            SpotError::Validation(msg) => AppError::validation(msg),
            SpotError::Picture(inner) => inner.into(),
            SpotError::Sqlx(_) => AppError::internal(err.to_string()),
        }
    }
}
