//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::{PgCartStore, PgCatalogStore, PgUserStore};
use crate::services::images::ImageStoreError;
use crate::services::{
    AuthService, CartService, CatalogService, FsImageStore, ImageStore, TokenService,
};
use crate::stores::revocation::RevocationRegistry;
use crate::stores::{CartStore, CatalogStore, CredentialStore, RevocationStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to shared
/// resources like the database pool, configuration, and the services wired
/// over the store ports.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    auth: AuthService,
    cart: CartService,
    catalog: CatalogService,
}

impl AppState {
    /// Create the production state: Postgres stores, the in-process
    /// revocation registry, and filesystem image storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the media directory cannot be created.
    pub async fn new(config: Config, pool: PgPool) -> Result<Self, ImageStoreError> {
        let users = Arc::new(PgUserStore::new(pool.clone()));
        let catalog_store = Arc::new(PgCatalogStore::new(pool.clone()));
        let carts = Arc::new(PgCartStore::new(pool.clone()));
        let revocations = Arc::new(RevocationRegistry::new());
        let images = Arc::new(FsImageStore::create(config.media_dir.clone(), "/media").await?);

        Ok(Self::with_stores(
            config,
            pool,
            users,
            catalog_store,
            carts,
            revocations,
            images,
        ))
    }

    /// Wire the state from explicit store implementations. Tests use this
    /// with the in-memory stores.
    ///
    /// Generic over the catalog store so the cart service can borrow its
    /// read surface ([`crate::stores::CatalogReader`]) from the same
    /// instance the catalog service mutates.
    #[must_use]
    pub fn with_stores<C: CatalogStore + 'static>(
        config: Config,
        pool: PgPool,
        users: Arc<dyn CredentialStore>,
        catalog: Arc<C>,
        carts: Arc<dyn CartStore>,
        revocations: Arc<dyn RevocationStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret);
        let auth = AuthService::new(users, revocations, tokens);
        let cart = CartService::new(catalog.clone(), carts);
        let catalog = CatalogService::new(catalog, images);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                cart,
                catalog,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}
