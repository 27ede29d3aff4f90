//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BODEGA_DATABASE_URL` - `PostgreSQL` connection string
//! - `BODEGA_JWT_SECRET` - Session token signing secret (min 32 chars)
//!
//! ## Optional
//! - `BODEGA_HOST` - Bind address (default: 127.0.0.1)
//! - `BODEGA_PORT` - Listen port (default: 3000)
//! - `BODEGA_MEDIA_DIR` - Directory for uploaded item images (default: media)
//! - `BODEGA_CORS_ORIGIN` - Allowed browser origin for credentialed requests
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const MIN_SECRET_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session token signing secret
    pub jwt_secret: SecretString,
    /// Directory for uploaded item images, served under `/media`
    pub media_dir: PathBuf,
    /// Allowed browser origin for credentialed CORS requests
    pub cors_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (length, placeholder detection).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("BODEGA_DATABASE_URL")?);
        let host = get_env_or_default("BODEGA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BODEGA_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("BODEGA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BODEGA_PORT".to_owned(), e.to_string()))?;
        let jwt_secret = get_validated_secret("BODEGA_JWT_SECRET")?;
        let media_dir = PathBuf::from(get_env_or_default("BODEGA_MEDIA_DIR", "media"));
        let cors_origin = get_optional_env("BODEGA_CORS_ORIGIN");
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            media_dir,
            cors_origin,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn get_required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn get_env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn get_optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_validated_secret(name: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(name)?;
    validate_secret_value(name, &value)?;
    Ok(SecretString::from(value))
}

/// Reject short or obviously-placeholder secrets before the server starts
/// signing tokens with them.
fn validate_secret_value(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("must be at least {MIN_SECRET_LENGTH} characters"),
        ));
    }

    let lowered = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lowered.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            name.to_owned(),
            format!("looks like a placeholder (contains {pattern:?})"),
        ));
    }

    Ok(())
}
