//! Catalog store backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use bodega_core::{ItemId, Price};

use crate::models::{Category, Item};
use crate::stores::{CatalogReader, CatalogStore, ItemFilter, NewItem, Page, RepositoryError};

const ITEM_COLUMNS: &str =
    "id, name, description, price, category, image_url, image_public_id, stock, created_at, updated_at";

/// Postgres-backed catalog store.
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    category: String,
    image_url: String,
    image_public_id: Option<String>,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ItemRow {
    /// Convert to the domain type, revalidating stored fields.
    fn into_domain(self) -> Result<Item, RepositoryError> {
        let price = Price::new(self.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        let category = self.category.parse::<Category>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid category in database: {e}"))
        })?;
        let stock = u32::try_from(self.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative stock in database: {}", self.stock))
        })?;

        Ok(Item {
            id: ItemId::new(self.id),
            name: self.name,
            description: self.description,
            price,
            category,
            image_url: self.image_url,
            image_public_id: self.image_public_id,
            stock,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Append the `WHERE` clause for `filter` to `builder`.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ItemFilter) {
    let mut prefix = " WHERE ";
    if let Some(category) = filter.category {
        builder.push(prefix).push("category = ");
        builder.push_bind(category.as_str());
        prefix = " AND ";
    }
    if let Some(min) = filter.min_price {
        builder.push(prefix).push("price >= ");
        builder.push_bind(min);
        prefix = " AND ";
    }
    if let Some(max) = filter.max_price {
        builder.push(prefix).push("price <= ");
        builder.push_bind(max);
        prefix = " AND ";
    }
    if let Some(search) = &filter.search {
        // Wildcards in the user's search are literal characters
        let escaped = search
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        builder.push(prefix).push("name ILIKE ");
        builder.push_bind(format!("%{escaped}%"));
    }
}

#[async_trait]
impl CatalogReader for PgCatalogStore {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }

    async fn create(&self, new_item: NewItem) -> Result<Item, RepositoryError> {
        let stock = i32::try_from(new_item.stock)
            .map_err(|_| RepositoryError::DataCorruption("stock out of range".to_owned()))?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "INSERT INTO items (id, name, description, price, category, image_url, stock)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_item.name)
        .bind(&new_item.description)
        .bind(new_item.price.amount())
        .bind(new_item.category.as_str())
        .bind(&new_item.image_url)
        .bind(stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("item name already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_domain()
    }

    async fn update(&self, item: &Item) -> Result<bool, RepositoryError> {
        let stock = i32::try_from(item.stock)
            .map_err(|_| RepositoryError::DataCorruption("stock out of range".to_owned()))?;

        let result = sqlx::query(
            "UPDATE items
             SET name = $1, description = $2, price = $3, category = $4,
                 image_url = $5, image_public_id = $6, stock = $7, updated_at = now()
             WHERE id = $8",
        )
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.amount())
        .bind(item.category.as_str())
        .bind(&item.image_url)
        .bind(&item.image_public_id)
        .bind(stock)
        .bind(item.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("item name already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "DELETE FROM items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }

    async fn list(
        &self,
        filter: &ItemFilter,
        page: Page,
    ) -> Result<(Vec<Item>, u64), RepositoryError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM items");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items"));
        push_filters(&mut query, filter);
        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(i64::from(page.size));
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let rows: Vec<ItemRow> = query.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(ItemRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, u64::try_from(total).unwrap_or(0)))
    }
}
