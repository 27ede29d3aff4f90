//! Business logic services.
//!
//! Services own the domain rules and depend on the store ports in
//! [`crate::stores`]; HTTP handlers stay thin and translate between
//! transport and these types.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod images;
pub mod tokens;

pub use auth::{AuthError, AuthService, Registration};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use images::{FsImageStore, ImageStore, ImageStoreError};
pub use tokens::{Claims, IssuedToken, TOKEN_TTL_SECS, TokenService};
