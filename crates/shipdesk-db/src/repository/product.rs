//! # Product Repository
//!
//! Database operations for the product lines packed in a box.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::rows::{convert_all, ProductRow, PRODUCT_COLUMNS};
use shipdesk_core::Product;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let lines = repo.for_box("box-uuid").await?;
/// repo.upsert(&line).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Products of one box in the order they were first saved.
    pub async fn for_box(&self, box_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE box_id = ?1 ORDER BY created_at, id",
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(box_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(convert_all(rows)?)
    }

    /// Every product in the store, for bulk sync.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products ORDER BY box_id, created_at, id",
            PRODUCT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(convert_all(rows)?)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::try_from).transpose()?)
    }

    /// Inserts or replaces a product line.
    ///
    /// `box_id` is part of the update so a line moved between boxes of the
    /// same shipment follows its new box.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.id, box_id = %product.box_id, "Upserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, box_id, product_type, description, weight_grams, rate_cents,
                quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                box_id = excluded.box_id,
                product_type = excluded.product_type,
                description = excluded.description,
                weight_grams = excluded.weight_grams,
                rate_cents = excluded.rate_cents,
                quantity = excluded.quantity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.box_id)
        .bind(&product.product_type)
        .bind(&product.description)
        .bind(product.weight.grams())
        .bind(product.rate.cents())
        .bind(product.quantity as i64)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts product lines.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
