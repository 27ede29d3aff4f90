//! Catalog item domain types.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bodega_core::{ItemId, Price};

/// Placeholder shown for items created without an image.
pub const DEFAULT_IMAGE_URL: &str = "https://via.placeholder.com/150";

/// A purchasable catalog entry.
///
/// `name` is globally unique; `price` and `stock` are never negative. The
/// cart reads `price` and `stock` fresh on every mutation, so these fields
/// are authoritative at all times.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category: Category,
    pub image_url: String,
    /// Object-storage handle for the uploaded image, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_public_id: Option<String>,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fixed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Clothing,
    Books,
    Home,
    Sports,
    Other,
}

/// Error parsing a [`Category`] from its string form.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 6] = [
        Self::Electronics,
        Self::Clothing,
        Self::Books,
        Self::Home,
        Self::Sports,
        Self::Other,
    ];

    /// Canonical string form, as stored and as accepted in requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Clothing => "Clothing",
            Self::Books => "Books",
            Self::Home => "Home",
            Self::Sports => "Sports",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_rejects_unknown() {
        assert!("Groceries".parse::<Category>().is_err());
        // Parsing is case-sensitive; the canonical form is capitalized
        assert!("electronics".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_uses_canonical_form() {
        let json = serde_json::to_string(&Category::Home).unwrap();
        assert_eq!(json, "\"Home\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::Home);
    }
}
