//! Authentication error types.

use thiserror::Error;

use crate::stores::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bodega_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// An account with this email already exists.
    #[error("account already exists")]
    AlreadyRegistered,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Name field failed validation.
    #[error("name validation failed: {0}")]
    InvalidName(String),

    /// Token missing, malformed, expired, or revoked.
    #[error("invalid or expired session token")]
    InvalidToken,

    /// The revocation registry could not be reached. Requests fail closed
    /// rather than accepting a possibly revoked token.
    #[error("revocation registry unavailable: {0}")]
    RevocationUnavailable(String),

    /// Token signing failed.
    #[error("token signing failed")]
    TokenSigning,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
