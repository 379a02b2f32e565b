//! # Box Repository
//!
//! Database operations for the boxes of a shipment.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::rows::{convert_all, BoxRow, BOX_COLUMNS};
use shipdesk_core::{InvoiceNumber, ShipmentBox};

/// Repository for box database operations.
#[derive(Debug, Clone)]
pub struct BoxRepository {
    pool: SqlitePool,
}

impl BoxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BoxRepository { pool }
    }

    /// Boxes of one shipment in the order they were first saved.
    pub async fn for_shipment(&self, invoice: &InvoiceNumber) -> DbResult<Vec<ShipmentBox>> {
        let sql = format!(
            "SELECT {} FROM boxes WHERE invoice_number = ?1 ORDER BY created_at, box_number, id",
            BOX_COLUMNS
        );

        let rows = sqlx::query_as::<_, BoxRow>(&sql)
            .bind(invoice.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(convert_all(rows)?)
    }

    /// Every box in the store, for bulk sync.
    pub async fn list_all(&self) -> DbResult<Vec<ShipmentBox>> {
        let sql = format!(
            "SELECT {} FROM boxes ORDER BY invoice_number, created_at, id",
            BOX_COLUMNS
        );

        let rows = sqlx::query_as::<_, BoxRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(convert_all(rows)?)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<ShipmentBox>> {
        let sql = format!("SELECT {} FROM boxes WHERE id = ?1", BOX_COLUMNS);

        let row = sqlx::query_as::<_, BoxRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ShipmentBox::try_from).transpose()?)
    }

    /// Inserts or replaces a box; `created_at` survives the replace.
    pub async fn upsert(&self, record: &ShipmentBox) -> DbResult<()> {
        debug!(box_id = %record.id, invoice = %record.invoice_number, "Upserting box");

        sqlx::query(
            r#"
            INSERT INTO boxes (
                id, invoice_number, box_number, length_cm, width_cm, height_cm,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                invoice_number = excluded.invoice_number,
                box_number = excluded.box_number,
                length_cm = excluded.length_cm,
                width_cm = excluded.width_cm,
                height_cm = excluded.height_cm,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(record.invoice_number.as_str())
        .bind(&record.box_number)
        .bind(record.dimensions.length_cm as i64)
        .bind(record.dimensions.width_cm as i64)
        .bind(record.dimensions.height_cm as i64)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes one box. Its products are the caller's responsibility.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM boxes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use shipdesk_core::{Dimensions, InvoiceNumber, ShipmentBox};

    fn record(id: &str, invoice: &InvoiceNumber, label: &str) -> ShipmentBox {
        let now = Utc::now();
        ShipmentBox {
            id: id.to_string(),
            invoice_number: invoice.clone(),
            box_number: label.to_string(),
            dimensions: Dimensions::new(40, 30, 20),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_boxes_are_scoped_to_shipment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = InvoiceNumber::parse("A-1").unwrap();
        let b = InvoiceNumber::parse("B-1").unwrap();

        db.boxes().upsert(&record("B1", &a, "1")).await.unwrap();
        db.boxes().upsert(&record("B2", &a, "2")).await.unwrap();
        db.boxes().upsert(&record("B3", &b, "1")).await.unwrap();

        let boxes = db.boxes().for_shipment(&a).await.unwrap();
        let ids: Vec<&str> = boxes.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "B2"]);
        assert_eq!(db.boxes().list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_upsert_replaces_fields() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inv = InvoiceNumber::parse("A-1").unwrap();

        db.boxes().upsert(&record("B1", &inv, "Box 1")).await.unwrap();
        let mut changed = record("B1", &inv, "Box 1A");
        changed.dimensions = Dimensions::new(1, 2, 3);
        db.boxes().upsert(&changed).await.unwrap();

        let loaded = db.boxes().get("B1").await.unwrap().unwrap();
        assert_eq!(loaded.box_number, "Box 1A");
        assert_eq!(loaded.dimensions, Dimensions::new(1, 2, 3));

        assert!(db.boxes().delete("B1").await.unwrap());
        assert!(db.boxes().get("B1").await.unwrap().is_none());
    }
}
