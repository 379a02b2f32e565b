//! # Shipment Repository
//!
//! Database operations for shipment root records.
//!
//! Shipments are keyed by their normalized invoice number. Writes are
//! upserts so a repeated save of the same shipment is harmless.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::rows::{convert_all, ShipmentRow, SHIPMENT_COLUMNS};
use shipdesk_core::{InvoiceNumber, Shipment};

/// Repository for shipment database operations.
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    pool: SqlitePool,
}

impl ShipmentRepository {
    /// Creates a new ShipmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShipmentRepository { pool }
    }

    /// Gets a shipment by invoice number.
    ///
    /// ## Returns
    /// * `Ok(Some(Shipment))` - Shipment found
    /// * `Ok(None)` - Shipment not found
    pub async fn get(&self, invoice: &InvoiceNumber) -> DbResult<Option<Shipment>> {
        let sql = format!(
            "SELECT {} FROM shipments WHERE invoice_number = ?1",
            SHIPMENT_COLUMNS
        );

        let row = sqlx::query_as::<_, ShipmentRow>(&sql)
            .bind(invoice.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Shipment::try_from).transpose()?)
    }

    /// Lists every shipment, most recently updated first.
    pub async fn list(&self) -> DbResult<Vec<Shipment>> {
        let sql = format!(
            "SELECT {} FROM shipments ORDER BY updated_at DESC, invoice_number",
            SHIPMENT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ShipmentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(convert_all(rows)?)
    }

    /// Inserts or replaces a shipment.
    ///
    /// ## Conflict Handling
    /// On an existing invoice number every column is overwritten except
    /// `created_at`, which keeps the first-save time.
    pub async fn upsert(&self, shipment: &Shipment) -> DbResult<()> {
        debug!(invoice = %shipment.invoice_number, "Upserting shipment");

        sqlx::query(
            r#"
            INSERT INTO shipments (
                invoice_number, shipper_name, shipper_address, shipper_phone,
                consignee_name, consignee_address, consignee_phone,
                origin, destination, carrier, airway_bill, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(invoice_number) DO UPDATE SET
                shipper_name = excluded.shipper_name,
                shipper_address = excluded.shipper_address,
                shipper_phone = excluded.shipper_phone,
                consignee_name = excluded.consignee_name,
                consignee_address = excluded.consignee_address,
                consignee_phone = excluded.consignee_phone,
                origin = excluded.origin,
                destination = excluded.destination,
                carrier = excluded.carrier,
                airway_bill = excluded.airway_bill,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(shipment.invoice_number.as_str())
        .bind(&shipment.shipper.name)
        .bind(&shipment.shipper.address)
        .bind(&shipment.shipper.phone)
        .bind(&shipment.consignee.name)
        .bind(&shipment.consignee.address)
        .bind(&shipment.consignee.phone)
        .bind(&shipment.origin)
        .bind(&shipment.destination)
        .bind(&shipment.carrier)
        .bind(&shipment.airway_bill)
        .bind(shipment.status.as_str())
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes the shipment row only. Boxes are removed by the caller first.
    ///
    /// ## Returns
    /// `true` when a row was deleted.
    pub async fn delete(&self, invoice: &InvoiceNumber) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM shipments WHERE invoice_number = ?1")
            .bind(invoice.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts shipments.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shipments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
