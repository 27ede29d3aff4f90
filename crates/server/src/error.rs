//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`; every failure is translated into the JSON envelope
//! `{"success": false, "message": …}` with the status encoding the error
//! class.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{AuthError, CartError, CatalogError, ImageStoreError};
use crate::stores::RepositoryError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Image storage operation failed.
    #[error("Image error: {0}")]
    Image(#[from] ImageStoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body sent for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::InvalidName(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::UserNotFound
                | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::AlreadyRegistered => StatusCode::CONFLICT,
                AuthError::RevocationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::Repository(err) => repository_status(err),
                AuthError::TokenSigning | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity(_) | CartError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::ItemNotFound
                | CartError::CartNotFound
                | CartError::LineNotFound => StatusCode::NOT_FOUND,
                CartError::Contention => StatusCode::CONFLICT,
                CartError::Repository(err) => repository_status(err),
            },
            Self::Catalog(err) => match err {
                CatalogError::NameTaken => StatusCode::CONFLICT,
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::InvalidPrice(_)
                | CatalogError::InvalidCategory(_)
                | CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CatalogError::Image(err) => image_status(err),
                CatalogError::Repository(err) => repository_status(err),
            },
            Self::Image(err) => image_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message; server-side details stay out of responses.
    fn message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_owned()
                }
                AuthError::AlreadyRegistered => {
                    "An account with this email already exists".to_owned()
                }
                AuthError::RevocationUnavailable(_) => {
                    "Session service unavailable, try again".to_owned()
                }
                AuthError::Repository(_)
                | AuthError::TokenSigning
                | AuthError::PasswordHash => "Internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Cart(err) => match err {
                CartError::Repository(RepositoryError::Unavailable(_)) => {
                    "Service unavailable, try again".to_owned()
                }
                CartError::Repository(_) => "Internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Catalog(err) => match err {
                CatalogError::Repository(RepositoryError::Unavailable(_)) => {
                    "Service unavailable, try again".to_owned()
                }
                CatalogError::Repository(_) | CatalogError::Image(ImageStoreError::Io(_)) => {
                    "Internal server error".to_owned()
                }
                other => other.to_string(),
            },
            Self::Image(ImageStoreError::Io(_)) => "Internal server error".to_owned(),
            other => other.to_string(),
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::Conflict(_) | RepositoryError::VersionConflict => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn image_status(err: &ImageStoreError) -> StatusCode {
    match err {
        ImageStoreError::UnsupportedType(_) | ImageStoreError::InvalidReference(_) => {
            StatusCode::BAD_REQUEST
        }
        ImageStoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            success: false,
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
