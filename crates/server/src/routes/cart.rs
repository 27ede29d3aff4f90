//! Cart route handlers.
//!
//! Every route requires a valid, non-revoked session token; the handlers
//! stay thin and delegate the stock/total rules to the cart service.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bodega_core::ItemId;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::CartView;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/update/{item_id}", put(update))
        .route("/remove/{item_id}", delete(remove))
        .route("/clear", delete(clear))
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_id: ItemId,
    pub quantity: Option<i64>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Cart payload envelope.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cart: CartView,
}

impl CartResponse {
    fn with_message(message: &str, cart: CartView) -> Self {
        Self {
            success: true,
            message: Some(message.to_owned()),
            cart,
        }
    }
}

#[instrument(skip(state, user))]
async fn show(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CartResponse>> {
    let cart = state.cart().get(user.user_id).await?;
    Ok(Json(CartResponse {
        success: true,
        message: None,
        cart,
    }))
}

#[instrument(skip(state, user, req))]
async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<CartResponse>> {
    let quantity = req.quantity.unwrap_or(1);
    let cart = state
        .cart()
        .add_item(user.user_id, req.item_id, quantity)
        .await?;
    Ok(Json(CartResponse::with_message("Item added to cart", cart)))
}

#[instrument(skip(state, user, req))]
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<ItemId>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>> {
    let cart = state
        .cart()
        .update_quantity(user.user_id, item_id, req.quantity)
        .await?;
    Ok(Json(CartResponse::with_message(
        "Cart updated successfully",
        cart,
    )))
}

#[instrument(skip(state, user))]
async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<ItemId>,
) -> Result<Json<CartResponse>> {
    let cart = state.cart().remove_item(user.user_id, item_id).await?;
    Ok(Json(CartResponse::with_message(
        "Item removed from cart",
        cart,
    )))
}

#[instrument(skip(state, user))]
async fn clear(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CartResponse>> {
    let cart = state.cart().clear(user.user_id).await?;
    Ok(Json(CartResponse::with_message(
        "Cart cleared successfully",
        cart,
    )))
}
