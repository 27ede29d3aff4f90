//! Database operations for the shop's `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `users` - Account records with password hashes
//! - `items` - Catalog entries
//! - `carts` / `cart_lines` - One cart per user with its lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run on server
//! startup via [`run_migrations`].

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod carts;
pub mod items;
pub mod users;

pub use carts::PgCartStore;
pub use items::PgCatalogStore;
pub use users::PgUserStore;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run database migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
