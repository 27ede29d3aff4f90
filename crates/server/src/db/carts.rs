//! Cart store backed by `PostgreSQL`.
//!
//! Saves are compare-and-swap: the `carts.version` column is only advanced
//! when it still matches the version the writer loaded, so a racing save
//! comes back as a version conflict instead of silently overwriting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use bodega_core::{CartId, ItemId, UserId};

use crate::models::{Cart, CartLine};
use crate::stores::{CartStore, RepositoryError};

/// Postgres-backed cart store.
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    total: Decimal,
    version: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    item_id: Uuid,
    quantity: i32,
}

impl LineRow {
    fn into_domain(self) -> Result<CartLine, RepositoryError> {
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "non-positive quantity in database: {}",
                self.quantity
            ))
        })?;
        Ok(CartLine {
            item_id: ItemId::new(self.item_id),
            quantity,
        })
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, total, version, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, LineRow>(
            "SELECT item_id, quantity FROM cart_lines WHERE cart_id = $1 ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LineRow::into_domain)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            lines,
            total: row.total,
            version: row.version,
            updated_at: row.updated_at,
        }))
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if cart.version == 0 {
            // First save: the row must not exist yet. A concurrent first
            // save surfaces as a conflict and the caller reloads.
            let inserted = sqlx::query(
                "INSERT INTO carts (id, user_id, total, version)
                 VALUES ($1, $2, $3, 1)
                 ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(cart.id.as_uuid())
            .bind(cart.user_id.as_uuid())
            .bind(cart.total)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(RepositoryError::VersionConflict);
            }
        } else {
            let updated = sqlx::query(
                "UPDATE carts
                 SET total = $1, version = version + 1, updated_at = now()
                 WHERE id = $2 AND version = $3",
            )
            .bind(cart.total)
            .bind(cart.id.as_uuid())
            .bind(cart.version)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(RepositoryError::VersionConflict);
            }
        }

        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for (position, line) in cart.lines.iter().enumerate() {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                RepositoryError::DataCorruption("quantity out of range".to_owned())
            })?;
            let position = i32::try_from(position).map_err(|_| {
                RepositoryError::DataCorruption("too many cart lines".to_owned())
            })?;
            sqlx::query(
                "INSERT INTO cart_lines (cart_id, item_id, quantity, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(cart.id.as_uuid())
            .bind(line.item_id.as_uuid())
            .bind(quantity)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
