//! Catalog item management.
//!
//! Straightforward CRUD over the catalog store plus the image-storage
//! integration. The only invariants live at the edges: names are unique,
//! price and stock are never negative, and image cleanup is best-effort —
//! a failed deletion is logged and never blocks the primary operation.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use bodega_core::{ItemId, Price, PriceError};

use crate::models::{Category, Item, item::DEFAULT_IMAGE_URL};
use crate::services::images::{ImageStore, ImageStoreError};
use crate::stores::{CatalogStore, ItemFilter, NewItem, Page, RepositoryError};

/// Maximum item name length.
const NAME_MAX: usize = 100;
/// Maximum item description length.
const DESCRIPTION_MAX: usize = 1000;
/// Default listing page size.
const DEFAULT_PAGE_SIZE: u32 = 10;
/// Hard cap on listing page size.
const MAX_PAGE_SIZE: u32 = 100;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// An item with this name already exists.
    #[error("an item with this name already exists")]
    NameTaken,

    /// The item does not exist.
    #[error("item not found")]
    NotFound,

    /// Negative price.
    #[error(transparent)]
    InvalidPrice(#[from] PriceError),

    /// Unknown category string.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// Other field validation failure.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Image upload failed.
    #[error(transparent)]
    Image(#[from] ImageStoreError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields for creating an item, before validation.
#[derive(Debug, Clone)]
pub struct CreateItem {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub stock: i64,
}

/// Partial update of an item; absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub stock: Option<i64>,
}

/// Listing parameters, straight from the query string.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Pagination metadata accompanying a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of catalog items.
#[derive(Debug, Clone, Serialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub pagination: Pagination,
}

/// Catalog service over the catalog store and image storage ports.
pub struct CatalogService {
    items: Arc<dyn CatalogStore>,
    images: Arc<dyn ImageStore>,
}

impl CatalogService {
    #[must_use]
    pub fn new(items: Arc<dyn CatalogStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { items, images }
    }

    /// Fetch a single item.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if it doesn't exist.
    pub async fn get(&self, id: ItemId) -> Result<Item, CatalogError> {
        self.items
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// List items matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidCategory` for an unknown category
    /// filter.
    pub async fn list(&self, query: ItemQuery) -> Result<ItemPage, CatalogError> {
        let category = match query.category.as_deref() {
            // "All" matches the whole catalog, same as no filter
            None | Some("All") => None,
            Some(raw) => Some(parse_category(raw)?),
        };
        let filter = ItemFilter {
            category,
            min_price: query.min_price,
            max_price: query.max_price,
            search: query.search.filter(|s| !s.trim().is_empty()),
        };
        let page = Page {
            number: query.page.unwrap_or(1).max(1),
            size: query
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        };

        let (items, total_items) = self.items.list(&filter, page).await?;

        let total_pages = u32::try_from(total_items.div_ceil(u64::from(page.size)))
            .unwrap_or(u32::MAX);
        Ok(ItemPage {
            items,
            pagination: Pagination {
                current_page: page.number,
                total_pages,
                total_items,
                items_per_page: page.size,
                has_next: page.number < total_pages,
                has_prev: page.number > 1,
            },
        })
    }

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NameTaken` for a duplicate name and the
    /// matching validation error for out-of-range fields.
    pub async fn create(&self, req: CreateItem) -> Result<Item, CatalogError> {
        let name = validate_text("name", &req.name, NAME_MAX)?;
        let description = validate_text("description", &req.description, DESCRIPTION_MAX)?;
        let price = Price::new(req.price)?;
        let category = parse_category(&req.category)?;
        let stock = validate_stock(req.stock)?;

        self.items
            .create(NewItem {
                name,
                description,
                price,
                category,
                image_url: req
                    .image_url
                    .filter(|url| !url.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_owned()),
                stock,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => CatalogError::NameTaken,
                other => CatalogError::Repository(other),
            })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item doesn't exist and
    /// `CatalogError::NameTaken` if a renamed item collides.
    pub async fn update(&self, id: ItemId, update: UpdateItem) -> Result<Item, CatalogError> {
        let mut item = self.get(id).await?;

        if let Some(name) = update.name {
            let name = validate_text("name", &name, NAME_MAX)?;
            if name != item.name
                && self.items.find_by_name(&name).await?.is_some()
            {
                return Err(CatalogError::NameTaken);
            }
            item.name = name;
        }
        if let Some(description) = update.description {
            item.description = validate_text("description", &description, DESCRIPTION_MAX)?;
        }
        if let Some(price) = update.price {
            item.price = Price::new(price)?;
        }
        if let Some(category) = update.category {
            item.category = parse_category(&category)?;
        }
        if let Some(image_url) = update.image_url {
            item.image_url = image_url;
        }
        if let Some(stock) = update.stock {
            item.stock = validate_stock(stock)?;
        }

        self.persist(&item).await?;
        self.get(id).await
    }

    /// Delete an item. The stored image, if any, is removed best-effort: a
    /// storage failure is logged and the deletion still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item doesn't exist.
    pub async fn delete(&self, id: ItemId) -> Result<(), CatalogError> {
        let item = self
            .items
            .delete(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        if let Some(public_id) = &item.image_public_id
            && let Err(e) = self.images.delete(public_id).await
        {
            tracing::warn!(item_id = %id, error = %e, "failed to delete item image");
        }
        Ok(())
    }

    /// Store an uploaded image and point the item at it, replacing (and
    /// best-effort deleting) any previous upload.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the item doesn't exist and
    /// `CatalogError::Image` if the upload itself fails.
    pub async fn attach_image(
        &self,
        id: ItemId,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Item, CatalogError> {
        let mut item = self.get(id).await?;

        let stored = self.images.upload(bytes, content_type).await?;
        let previous = item.image_public_id.replace(stored.public_id);
        item.image_url = stored.url;

        self.persist(&item).await?;

        if let Some(public_id) = previous
            && let Err(e) = self.images.delete(&public_id).await
        {
            tracing::warn!(item_id = %id, error = %e, "failed to delete replaced item image");
        }

        self.get(id).await
    }

    async fn persist(&self, item: &Item) -> Result<(), CatalogError> {
        match self.items.update(item).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(CatalogError::NotFound),
            Err(RepositoryError::Conflict(_)) => Err(CatalogError::NameTaken),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_category(raw: &str) -> Result<Category, CatalogError> {
    raw.parse::<Category>()
        .map_err(|e| CatalogError::InvalidCategory(e.0))
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidInput(format!("{field} is required")));
    }
    if trimmed.len() > max {
        return Err(CatalogError::InvalidInput(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

fn validate_stock(stock: i64) -> Result<u32, CatalogError> {
    // Bounded by the store's INTEGER column
    if !(0..=i64::from(i32::MAX)).contains(&stock) {
        return Err(CatalogError::InvalidInput(
            "stock must be a non-negative integer".to_owned(),
        ));
    }
    u32::try_from(stock)
        .map_err(|_| CatalogError::InvalidInput("stock must be a non-negative integer".to_owned()))
}
