//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bodega_core::{CartId, ItemId, UserId};

use super::item::Item;

/// A user's persisted cart.
///
/// One cart exists per user. `total` is derived: it is recomputed from the
/// current catalog prices every time the cart is saved and is never mutated
/// independently. `version` is the optimistic-concurrency token; a save with
/// a stale version is rejected by the store.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// One (item, quantity) pair within a cart. No two lines of the same cart
/// reference the same item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl Cart {
    /// A fresh, unpersisted cart for `user_id`. Version 0 tells the store
    /// this cart has never been saved.
    #[must_use]
    pub fn new_for(user_id: UserId) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            lines: Vec::new(),
            total: Decimal::ZERO,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// The line referencing `item_id`, if present.
    #[must_use]
    pub fn line(&self, item_id: ItemId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.item_id == item_id)
    }

    /// Set the quantity for `item_id`, merging into an existing line or
    /// appending a new one.
    pub fn set_quantity(&mut self, item_id: ItemId, quantity: u32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item_id) {
            line.quantity = quantity;
        } else {
            self.lines.push(CartLine { item_id, quantity });
        }
    }

    /// Remove the line referencing `item_id`. Returns whether a line was
    /// removed.
    pub fn remove_line(&mut self, item_id: ItemId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.item_id != item_id);
        self.lines.len() < before
    }
}

/// Denormalized cart payload for API responses: each line resolved to the
/// item's current catalog details.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: Decimal,
}

/// One resolved cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: ItemId,
    pub name: String,
    pub price: Decimal,
    pub image_url: String,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl CartView {
    /// The read-time default for users without a persisted cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Build a view from resolved (line, item) pairs and the cart total.
    #[must_use]
    pub fn from_resolved(resolved: &[(CartLine, Item)], total: Decimal) -> Self {
        Self {
            items: resolved
                .iter()
                .map(|(line, item)| CartLineView {
                    item_id: item.id,
                    name: item.name.clone(),
                    price: item.price.amount(),
                    image_url: item.image_url.clone(),
                    quantity: line.quantity,
                    line_total: item.price.times(line.quantity),
                })
                .collect(),
            total,
        }
    }
}
