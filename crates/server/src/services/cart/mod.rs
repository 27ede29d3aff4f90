//! The cart aggregate.
//!
//! Every mutation re-reads the referenced items from the catalog, enforces
//! the stock bound against the quantity being set, recomputes the derived
//! total from current prices, and persists through a compare-and-swap save.
//! Totals therefore always equal the sum of `price * quantity` over the
//! lines at last save; there are no price-lock semantics, so a later price
//! change moves the total at the next save.
//!
//! The load-mutate-save cycle is not atomic on its own. Lost updates are
//! prevented by the cart's version token: a save racing a concurrent writer
//! fails with a version conflict and the whole cycle is re-run against the
//! fresh state, so concurrent additions land additively.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use bodega_core::{ItemId, UserId};

use crate::models::{Cart, CartLine, CartView, Item};
use crate::stores::{CartStore, CatalogReader, RepositoryError};

/// How many times a mutation is retried after losing a compare-and-swap
/// save before giving up with [`CartError::Contention`].
const MAX_SAVE_ATTEMPTS: u32 = 3;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity out of range for the operation.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// The referenced catalog item does not exist.
    #[error("item not found")]
    ItemNotFound,

    /// The user has no persisted cart.
    #[error("cart not found")]
    CartNotFound,

    /// The cart has no line for the referenced item.
    #[error("item not found in cart")]
    LineNotFound,

    /// The requested quantity exceeds the item's current stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// Every save attempt lost against concurrent writers.
    #[error("cart was modified concurrently")]
    Contention,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service over the catalog-read and cart-persistence ports.
pub struct CartService {
    catalog: Arc<dyn CatalogReader>,
    carts: Arc<dyn CartStore>,
}

impl CartService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogReader>, carts: Arc<dyn CartStore>) -> Self {
        Self { catalog, carts }
    }

    /// The user's cart, resolved to current item details.
    ///
    /// A user without a persisted cart gets the empty view; this is a
    /// read-time default, nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a store read fails.
    pub async fn get(&self, user_id: UserId) -> Result<CartView, CartError> {
        let Some(mut cart) = self.carts.find_by_user(user_id).await? else {
            return Ok(CartView::empty());
        };
        let resolved = self.resolve_lines(&mut cart).await?;
        Ok(CartView::from_resolved(&resolved, cart.total))
    }

    /// Add `quantity` units of an item, merging into an existing line.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` if `quantity < 1`, `ItemNotFound` if the item does
    /// not exist, `InsufficientStock` if the merged line quantity would
    /// exceed the item's current stock.
    pub async fn add_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let item = self
                .catalog
                .find_by_id(item_id)
                .await?
                .ok_or(CartError::ItemNotFound)?;

            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .unwrap_or_else(|| Cart::new_for(user_id));

            let existing = cart.line(item_id).map_or(0, |line| line.quantity);
            let merged = existing
                .checked_add(quantity)
                .ok_or(CartError::InvalidQuantity(i64::from(quantity)))?;
            if item.stock < merged {
                return Err(CartError::InsufficientStock {
                    requested: merged,
                    available: item.stock,
                });
            }
            cart.set_quantity(item_id, merged);

            if let Some(view) = self.finish(&mut cart, attempt).await? {
                return Ok(view);
            }
        }
        Err(CartError::Contention)
    }

    /// Overwrite the quantity of an existing line; zero removes the line.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` if `quantity < 0`, `CartNotFound`/`LineNotFound` if
    /// there is nothing to update, `ItemNotFound` if the item has since left
    /// the catalog, `InsufficientStock` if `quantity` exceeds current stock.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;

        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .ok_or(CartError::CartNotFound)?;
            if cart.line(item_id).is_none() {
                return Err(CartError::LineNotFound);
            }

            let item = self
                .catalog
                .find_by_id(item_id)
                .await?
                .ok_or(CartError::ItemNotFound)?;

            if quantity == 0 {
                cart.remove_line(item_id);
            } else {
                if quantity > item.stock {
                    return Err(CartError::InsufficientStock {
                        requested: quantity,
                        available: item.stock,
                    });
                }
                cart.set_quantity(item_id, quantity);
            }

            if let Some(view) = self.finish(&mut cart, attempt).await? {
                return Ok(view);
            }
        }
        Err(CartError::Contention)
    }

    /// Remove the line for an item.
    ///
    /// # Errors
    ///
    /// `CartNotFound`/`LineNotFound` if there is nothing to remove.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<CartView, CartError> {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .ok_or(CartError::CartNotFound)?;
            if !cart.remove_line(item_id) {
                return Err(CartError::LineNotFound);
            }

            if let Some(view) = self.finish(&mut cart, attempt).await? {
                return Ok(view);
            }
        }
        Err(CartError::Contention)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// `CartNotFound` if no cart has ever been persisted for the user.
    pub async fn clear(&self, user_id: UserId) -> Result<CartView, CartError> {
        for attempt in 1..=MAX_SAVE_ATTEMPTS {
            let mut cart = self
                .carts
                .find_by_user(user_id)
                .await?
                .ok_or(CartError::CartNotFound)?;
            cart.lines.clear();

            if let Some(view) = self.finish(&mut cart, attempt).await? {
                return Ok(view);
            }
        }
        Err(CartError::Contention)
    }

    /// Recompute the derived total and attempt the compare-and-swap save.
    /// Returns `Ok(None)` when the save lost and the cycle should re-run.
    async fn finish(
        &self,
        cart: &mut Cart,
        attempt: u32,
    ) -> Result<Option<CartView>, CartError> {
        let resolved = self.resolve_lines(cart).await?;
        cart.total = resolved
            .iter()
            .map(|(line, item)| item.price.times(line.quantity))
            .sum::<Decimal>();

        match self.carts.save(cart).await {
            Ok(()) => Ok(Some(CartView::from_resolved(&resolved, cart.total))),
            Err(RepositoryError::VersionConflict) if attempt < MAX_SAVE_ATTEMPTS => {
                tracing::debug!(
                    user_id = %cart.user_id,
                    attempt,
                    "cart save lost to concurrent writer, retrying"
                );
                Ok(None)
            }
            Err(RepositoryError::VersionConflict) => Err(CartError::Contention),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch the current catalog item for every line. Lines whose item has
    /// been deleted from the catalog are dropped: there is no current price
    /// to derive a total from.
    async fn resolve_lines(&self, cart: &mut Cart) -> Result<Vec<(CartLine, Item)>, CartError> {
        let mut resolved = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            if let Some(item) = self.catalog.find_by_id(line.item_id).await? {
                resolved.push((line.clone(), item));
            }
        }
        cart.lines = resolved.iter().map(|(line, _)| line.clone()).collect();
        Ok(resolved)
    }
}
