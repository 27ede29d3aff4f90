//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (probes the database)
//!
//! # Auth
//! POST /user/register           - Create an account, set the session cookie
//! POST /user/login              - Login, set the session cookie
//! POST /user/logout             - Revoke the current token, clear the cookie
//! GET  /user/profile            - The authenticated user
//!
//! # Cart (requires a valid, non-revoked session token)
//! GET    /cart                  - The user's cart (empty view if none)
//! POST   /cart/add              - Add an item (merges quantities)
//! PUT    /cart/update/{item_id} - Overwrite a line's quantity (0 removes)
//! DELETE /cart/remove/{item_id} - Remove a line
//! DELETE /cart/clear            - Empty the cart
//!
//! # Catalog
//! GET    /items                 - List with filters and pagination
//! GET    /items/{id}            - Single item
//! POST   /items                 - Create (admin)
//! PUT    /items/{id}            - Update (admin)
//! DELETE /items/{id}            - Delete (admin)
//! POST   /items/{id}/image      - Upload the item image (admin, multipart)
//! ```

pub mod auth;
pub mod cart;
pub mod items;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Envelope for responses that carry no payload beyond the outcome.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Assemble the application routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/user", auth::routes())
        .nest("/cart", cart::routes())
        .nest("/items", items::routes())
}
