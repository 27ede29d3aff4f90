//! Token revocation registry backed by a TTL cache.
//!
//! Logout must invalidate a token that is otherwise valid until its embedded
//! expiry. The registry records the raw token with an entry TTL equal to the
//! remaining token lifetime, so storage is bounded by the set of revoked,
//! still-live tokens: the cache's own per-entry expiration removes entries
//! the moment the token they block would have expired anyway.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::{Expiry, future::Cache};

use super::{RepositoryError, RevocationStore};

/// Upper bound on tracked revocations. Entries expire with their token, so
/// this is a backstop, not a working limit.
const MAX_TRACKED_REVOCATIONS: u64 = 100_000;

/// Expiry policy: each entry lives exactly until the revoked token's own
/// expiry instant.
struct TokenExpiry;

impl Expiry<String, DateTime<Utc>> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        expires_at: &DateTime<Utc>,
        _created_at: Instant,
    ) -> Option<Duration> {
        // A non-positive remaining lifetime converts to an immediate expiry.
        Some((*expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

/// In-process revocation registry.
pub struct RevocationRegistry {
    blocked: Cache<String, DateTime<Utc>>,
}

impl RevocationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocked: Cache::builder()
                .max_capacity(MAX_TRACKED_REVOCATIONS)
                .expire_after(TokenExpiry)
                .build(),
        }
    }
}

impl Default for RevocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for RevocationRegistry {
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        // Nothing to protect once the token has expired on its own.
        if expires_at <= Utc::now() {
            return Ok(());
        }
        self.blocked.insert(token.to_owned(), expires_at).await;
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, RepositoryError> {
        Ok(self.blocked.get(token).await.is_some())
    }
}
