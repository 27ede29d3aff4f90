//! Authentication service.
//!
//! Registration and login issue stateless session tokens; logout records the
//! token in the revocation registry until its natural expiry. Every
//! authenticated request is checked in two steps: signature/expiry
//! verification, then a revocation lookup. Both steps fail closed.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};

use bodega_core::{Email, UserId};

use crate::models::User;
use crate::services::tokens::{Claims, IssuedToken, TokenService};
use crate::stores::{CredentialStore, NewUser, RepositoryError, RevocationStore};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Bounds for first/last name fields.
const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 50;

/// A registration request after transport decoding.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Authentication service.
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    revocations: Arc<dyn RevocationStore>,
    tokens: TokenService,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
        tokens: TokenService,
    ) -> Self {
        Self {
            users,
            revocations,
            tokens,
        }
    }

    /// Register a new user and issue their first session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidName`, or
    /// `AuthError::WeakPassword` when a field fails validation, and
    /// `AuthError::AlreadyRegistered` if the email is taken.
    pub async fn register(&self, reg: Registration) -> Result<(User, IssuedToken), AuthError> {
        let email = Email::parse(&reg.email)?;
        let first_name = validate_name("first name", &reg.first_name)?;
        let last_name = validate_name("last name", &reg.last_name)?;
        validate_password(&reg.password)?;

        let password_hash = hash_password(&reg.password)?;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AlreadyRegistered,
                other => AuthError::Repository(other),
            })?;

        let issued = self.issue(&user)?;
        Ok((user, issued))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or wrong
    /// password; the two cases are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .find_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let issued = self.issue(&user)?;
        Ok((user, issued))
    }

    /// Revoke `token` until `expires_at`, its embedded expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RevocationUnavailable` if the registry cannot be
    /// reached; silent success here would leave the token usable until its
    /// natural expiry.
    pub async fn logout(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        self.revocations
            .revoke(token, expires_at)
            .await
            .map_err(|e| AuthError::RevocationUnavailable(e.to_string()))
    }

    /// Authorize a request token: verify signature and expiry, then check
    /// the revocation registry for a blocking entry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad or revoked token and
    /// `AuthError::RevocationUnavailable` when the registry cannot be
    /// consulted (fail closed).
    pub async fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self
            .tokens
            .verify(token)
            .map_err(|_| AuthError::InvalidToken)?;

        let revoked = self
            .revocations
            .is_revoked(token)
            .await
            .map_err(|e| AuthError::RevocationUnavailable(e.to_string()))?;
        if revoked {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.tokens.issue(user).map_err(|_| AuthError::TokenSigning)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate and trim a name field.
fn validate_name(field: &str, value: &str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.len() < MIN_NAME_LENGTH || trimmed.len() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "{field} must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use secrecy::SecretString;

    use crate::stores::memory::InMemoryUsers;
    use crate::stores::revocation::RevocationRegistry;

    use super::*;

    fn test_service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryUsers::new()),
            Arc::new(RevocationRegistry::new()),
            TokenService::new(&SecretString::from("0123456789abcdef0123456789abcdef")),
        )
    }

    fn registration() -> Registration {
        Registration {
            first_name: "Sam".to_owned(),
            last_name: "Shopper".to_owned(),
            email: "sam@example.com".to_owned(),
            password: "hunter22".to_owned(),
        }
    }

    #[test]
    fn test_password_hash_and_verify_correct() {
        let hash = hash_password("my-secure-password").unwrap();
        assert!(verify_password("my-secure-password", &hash).is_ok());
    }

    #[test]
    fn test_password_verify_wrong() {
        let hash = hash_password("correct-password").unwrap();
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_password("same-password", &hash1).is_ok());
        assert!(verify_password("same-password", &hash2).is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = test_service();

        let (user, issued) = service.register(registration()).await.unwrap();
        assert_eq!(user.email.as_str(), "sam@example.com");
        service.authenticate(&issued.token).await.unwrap();

        let (logged_in, token) = service.login("sam@example.com", "hunter22").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let claims = service.authenticate(&token.token).await.unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn test_login_is_case_insensitive_on_email() {
        let service = test_service();
        service.register(registration()).await.unwrap();

        assert!(service.login("SAM@Example.COM", "hunter22").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = test_service();
        service.register(registration()).await.unwrap();

        assert!(matches!(
            service.login("sam@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let service = test_service();
        assert!(matches!(
            service.login("nobody@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let service = test_service();
        service.register(registration()).await.unwrap();

        // Same address in a different case is still the same account
        let mut again = registration();
        again.email = "SAM@EXAMPLE.COM".to_owned();
        assert!(matches!(
            service.register(again).await,
            Err(AuthError::AlreadyRegistered)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let service = test_service();
        let mut reg = registration();
        reg.password = "short".to_owned();
        assert!(matches!(
            service.register(reg).await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_names() {
        let service = test_service();
        let mut reg = registration();
        reg.first_name = "S".to_owned();
        assert!(matches!(
            service.register(reg).await,
            Err(AuthError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_token_for_all_later_requests() {
        let service = test_service();
        let (_, issued) = service.register(registration()).await.unwrap();

        service.authenticate(&issued.token).await.unwrap();
        service.logout(&issued.token, issued.expires_at).await.unwrap();

        assert!(matches!(
            service.authenticate(&issued.token).await,
            Err(AuthError::InvalidToken)
        ));
        // And it stays revoked
        assert!(matches!(
            service.authenticate(&issued.token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_does_not_affect_other_sessions() {
        let service = test_service();
        let (_, first) = service.register(registration()).await.unwrap();
        let (_, second) = service.login("sam@example.com", "hunter22").await.unwrap();

        service.logout(&first.token, first.expires_at).await.unwrap();

        assert!(service.authenticate(&first.token).await.is_err());
        service.authenticate(&second.token).await.unwrap();
    }

    /// Registry that always fails, for the fail-closed paths.
    struct UnreachableRegistry;

    #[async_trait]
    impl RevocationStore for UnreachableRegistry {
        async fn revoke(
            &self,
            _token: &str,
            _expires_at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_owned()))
        }

        async fn is_revoked(&self, _token: &str) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_owned()))
        }
    }

    #[tokio::test]
    async fn test_registry_outage_fails_closed() {
        let service = AuthService::new(
            Arc::new(InMemoryUsers::new()),
            Arc::new(UnreachableRegistry),
            TokenService::new(&SecretString::from("0123456789abcdef0123456789abcdef")),
        );

        let (_, issued) = service.register(registration()).await.unwrap();

        // A structurally valid token is still denied when revocation cannot
        // be ruled out.
        assert!(matches!(
            service.authenticate(&issued.token).await,
            Err(AuthError::RevocationUnavailable(_))
        ));

        // Logout surfaces the outage instead of silently succeeding.
        assert!(matches!(
            service.logout(&issued.token, issued.expires_at).await,
            Err(AuthError::RevocationUnavailable(_))
        ));
    }
}
