//! # Maintenance Repository
//!
//! Orphan detection and removal for the local store.
//!
//! ## What Is an Orphan?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  shipments           boxes                    products                  │
//! │  ─────────           ─────                    ────────                  │
//! │  INV-1       ◄────── B1 (INV-1)      ◄─────── P1 (B1)                   │
//! │                      B7 (INV-9) ✗             P4 (B7)  ✗ (after sweep)  │
//! │                                                P9 (B3)  ✗               │
//! │                                                                         │
//! │  B7: its shipment INV-9 is gone          → deleted                     │
//! │  P9: its box B3 is gone                  → deleted                     │
//! │  P4: its box B7 is deleted in this sweep → deleted in the same sweep   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Boxes go first so that a single sweep also catches their products;
//! a second sweep right after always finds nothing.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use shipdesk_core::OrphanCounts;

#[derive(Debug, Clone)]
pub struct MaintenanceRepository {
    pool: SqlitePool,
}

impl MaintenanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MaintenanceRepository { pool }
    }

    /// Deletes orphaned boxes and products in one transaction.
    pub async fn delete_orphans(&self) -> DbResult<OrphanCounts> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let boxes = sqlx::query(
            "DELETE FROM boxes WHERE invoice_number NOT IN (SELECT invoice_number FROM shipments)",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let products = sqlx::query("DELETE FROM products WHERE box_id NOT IN (SELECT id FROM boxes)")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let counts = OrphanCounts { boxes, products };
        if counts.is_empty() {
            debug!("No local orphans found");
        } else {
            info!(
                boxes = counts.boxes,
                products = counts.products,
                "Deleted local orphans"
            );
        }

        Ok(counts)
    }

    /// Counts orphans without deleting them.
    ///
    /// Products are counted against live boxes only, so a product under an
    /// orphaned box is not double counted as its box would remove it.
    pub async fn count_orphans(&self) -> DbResult<OrphanCounts> {
        let boxes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM boxes WHERE invoice_number NOT IN (SELECT invoice_number FROM shipments)",
        )
        .fetch_one(&self.pool)
        .await?;

        let products: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE box_id NOT IN (
                SELECT id FROM boxes
                WHERE invoice_number IN (SELECT invoice_number FROM shipments)
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OrphanCounts {
            boxes: boxes as u64,
            products: products as u64,
        })
    }
}
