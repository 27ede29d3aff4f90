//! Session token issuance and verification.
//!
//! Tokens are stateless: validity is proven by the HMAC signature plus the
//! embedded expiry, so the issuer stores nothing. Revocation is layered on
//! top by the auth service, not here.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bodega_core::UserId;

use crate::models::{Role, User};

/// Session token lifetime: one hour from issuance.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Errors from token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature invalid, payload malformed, or expiry passed.
    #[error("invalid token")]
    Invalid,

    /// Signing failed (key/serialization problem).
    #[error("token signing failed")]
    Signing,
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: UserId,
    /// Email at issuance time.
    pub email: String,
    /// Role at issuance time; a promoted or demoted user must log in again
    /// for this to update.
    pub role: Role,
    /// Issued-at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds).
    pub exp: i64,
}

impl Claims {
    /// The absolute expiry instant embedded in the token.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// A freshly signed token with its expiry, for cookie max-age alignment.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for `user`, valid for [`TOKEN_TTL_SECS`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        self.issue_with_ttl(user, TOKEN_TTL_SECS)
    }

    fn issue_with_ttl(&self, user: &User, ttl_secs: i64) -> Result<IssuedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.to_string(),
            role: user.role,
            iat: now,
            exp: now + ttl_secs,
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// This does not consult the revocation registry; that composition is
    /// the auth service's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] on any verification failure.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        // Expiry is exact: a token one second past its embedded expiry is
        // rejected.
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}
