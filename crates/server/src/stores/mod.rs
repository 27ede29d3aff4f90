//! Store ports consumed by the service layer.
//!
//! Each backing store is an explicitly passed trait object rather than a
//! process-wide handle, so services can be wired against Postgres in
//! production and against the in-memory implementations in tests. The sqlx
//! implementations live in [`crate::db`]; [`memory`] holds the in-memory
//! ones and [`revocation`] the TTL-cache revocation registry.

pub mod memory;
pub mod revocation;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use bodega_core::{Email, ItemId, UserId};

use crate::models::{Cart, Category, Item, User};

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A compare-and-swap save lost against a concurrent writer.
    #[error("concurrent modification")]
    VersionConflict,

    /// A stored value failed domain validation.
    #[error("invalid stored data: {0}")]
    DataCorruption(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fields required to create a user record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Holds user identity records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user together with their password hash, for login.
    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the email is already
    /// registered.
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError>;
}

/// The read surface the cart depends on: current price and stock by item id,
/// fetched fresh on every mutation (never cached across requests).
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;
}

/// Fields required to create a catalog item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub price: bodega_core::Price,
    pub category: Category,
    pub image_url: String,
    pub stock: u32,
}

/// Equality/range/pattern filters for catalog listings.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub category: Option<Category>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive substring match on the item name.
    pub search: Option<String>,
}

/// Skip/limit pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Items per page.
    pub size: u32,
}

impl Page {
    /// Rows to skip before this page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.number.saturating_sub(1) as i64) * (self.size as i64)
    }
}

/// Full catalog store: the cart-facing read surface plus the privileged
/// mutations used by item management.
#[async_trait]
pub trait CatalogStore: CatalogReader {
    async fn find_by_name(&self, name: &str) -> Result<Option<Item>, RepositoryError>;

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the name is taken.
    async fn create(&self, new_item: NewItem) -> Result<Item, RepositoryError>;

    /// Persist updated fields of an existing item. Returns `false` if the
    /// item no longer exists.
    async fn update(&self, item: &Item) -> Result<bool, RepositoryError>;

    /// Delete an item, returning it if it existed.
    async fn delete(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;

    /// List items matching `filter`, newest first, within `page`. Returns
    /// the page of items and the total match count.
    async fn list(
        &self,
        filter: &ItemFilter,
        page: Page,
    ) -> Result<(Vec<Item>, u64), RepositoryError>;
}

/// Persists carts with optimistic concurrency.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Save `cart`, guarded by its version: version 0 inserts a cart that
    /// must not yet exist, any other version updates the stored cart only if
    /// its version still matches. The stored version becomes
    /// `cart.version + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionConflict`] when a concurrent writer
    /// got there first; callers reload and retry.
    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Records tokens invalidated before their natural expiry.
///
/// Entries self-expire at the token's own expiry through the backing store's
/// native TTL, so the registry never outgrows the set of live tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token` as blocked until `expires_at`. A call with an
    /// `expires_at` in the past is a no-op; revoking twice is safe.
    async fn revoke(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Whether a blocking entry exists for `token`.
    async fn is_revoked(&self, token: &str) -> Result<bool, RepositoryError>;
}
