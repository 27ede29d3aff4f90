//! Authentication extractors.
//!
//! `CurrentUser` is the composition point of the session design: it pulls
//! the token from the request, has the auth service verify the signature and
//! expiry, and then consults the revocation registry. A registry outage
//! denies the request (fail closed).

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{DateTime, Utc};

use bodega_core::UserId;

use crate::error::AppError;
use crate::models::Role;
use crate::state::AppState;

/// Cookie carrying the session token for browser clients; API clients send
/// a bearer header instead.
pub const SESSION_COOKIE_NAME: &str = "token";

/// Extractor that requires a valid, non-revoked session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    /// The raw token the request authenticated with; logout revokes exactly
    /// this credential.
    pub token: String,
    /// The token's embedded expiry, which bounds the revocation entry.
    pub expires_at: DateTime<Utc>,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or_else(|| AppError::Unauthorized("missing session token".to_owned()))?;

        let claims = state.auth().authenticate(&token).await?;

        Ok(Self {
            expires_at: claims.expires_at(),
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            token,
        })
    }
}

/// Extractor that additionally requires the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden("admin access required".to_owned()));
        }
        Ok(Self(user))
    }
}

/// Token from an `Authorization: Bearer …` header.
fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Token from the session cookie.
fn cookie_token(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE_NAME && !value.is_empty()).then(|| value.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header_name: header::HeaderName, value: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .header(header_name, value)
            .body(())
            .expect("request build")
            .into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts).as_deref(), Some("abc.def.ghi"));

        let parts = parts_with(header::AUTHORIZATION, "Basic dXNlcg==");
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_cookie_token_extraction() {
        let parts = parts_with(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(cookie_token(&parts).as_deref(), Some("abc.def.ghi"));

        let parts = parts_with(header::COOKIE, "theme=dark");
        assert_eq!(cookie_token(&parts), None);

        // A cleared cookie is not a credential
        let parts = parts_with(header::COOKIE, "token=");
        assert_eq!(cookie_token(&parts), None);
    }
}
