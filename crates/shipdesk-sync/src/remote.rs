//! # Postgres RemoteStore
//!
//! The cloud mirror, reached over a `PgPool`.
//!
//! ## Session Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PgRemoteStore::connect(url)   ← lazy pool, no network yet             │
//! │       │                                                                 │
//! │       ├── ping()               ← one round trip; CLI sets the flag     │
//! │       ├── sign_in(user)        ← enables every data call               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_* / list_* / upsert_* / delete_*                                  │
//! │       └── StoreError::Unauthorized until sign_in                       │
//! │                                                                         │
//! │  sign_out()                    ← data calls fail again                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows decode into the same [`shipdesk_db::rows`] types as the local store;
//! the Postgres schema keeps the column names and uses BIGINT for that.
//! Writes merge with `ON CONFLICT DO UPDATE`, so replaying a write is safe.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use shipdesk_core::{
    CoreError, InvoiceNumber, MasterRecord, OrphanCounts, Product, Shipment, ShipmentBox,
};
use shipdesk_db::rows::{
    convert_all, BoxRow, MasterRow, ProductRow, ShipmentRow, BOX_COLUMNS, MASTER_COLUMNS,
    PRODUCT_COLUMNS, SHIPMENT_COLUMNS,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{RemoteStore, ShipmentStore};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/postgres");

fn decode_failed(err: CoreError) -> StoreError {
    StoreError::Backend(format!("remote row does not decode: {err}"))
}

/// Postgres-backed [`RemoteStore`].
#[derive(Debug)]
pub struct PgRemoteStore {
    pool: PgPool,
    session: RwLock<Option<String>>,
}

impl PgRemoteStore {
    /// Builds a lazy pool. Nothing touches the network until the first call.
    pub fn connect(database_url: &str, connect_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(connect_timeout)
            .connect_lazy(database_url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PgRemoteStore {
            pool,
            session: RwLock::new(None),
        }
    }

    /// One round trip to the server.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Applies the remote schema migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Applying remote migrations");
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        info!(user = %user_id, "Signed in to remote store");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
    }

    pub fn sign_out(&self) {
        info!("Signed out of remote store");
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn current_user(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RemoteStore for PgRemoteStore {
    fn requires_authenticated_user(&self) -> StoreResult<()> {
        match self.current_user() {
            Some(_) => Ok(()),
            None => Err(StoreError::Unauthorized),
        }
    }
}

#[async_trait]
impl ShipmentStore for PgRemoteStore {
    async fn get_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<Option<Shipment>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM shipments WHERE invoice_number = $1",
            SHIPMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, ShipmentRow>(&sql)
            .bind(invoice.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Shipment::try_from).transpose().map_err(decode_failed)
    }

    async fn list_shipments(&self) -> StoreResult<Vec<Shipment>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM shipments ORDER BY created_at DESC, invoice_number",
            SHIPMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShipmentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows).map_err(decode_failed)
    }

    async fn upsert_shipment(&self, shipment: &Shipment) -> StoreResult<()> {
        self.requires_authenticated_user()?;
        debug!(invoice = %shipment.invoice_number, "Remote upsert shipment");

        sqlx::query(
            r#"
            INSERT INTO shipments (
                invoice_number, shipper_name, shipper_address, shipper_phone,
                consignee_name, consignee_address, consignee_phone,
                origin, destination, carrier, airway_bill, status,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (invoice_number) DO UPDATE SET
                shipper_name = EXCLUDED.shipper_name,
                shipper_address = EXCLUDED.shipper_address,
                shipper_phone = EXCLUDED.shipper_phone,
                consignee_name = EXCLUDED.consignee_name,
                consignee_address = EXCLUDED.consignee_address,
                consignee_phone = EXCLUDED.consignee_phone,
                origin = EXCLUDED.origin,
                destination = EXCLUDED.destination,
                carrier = EXCLUDED.carrier,
                airway_bill = EXCLUDED.airway_bill,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
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

    async fn delete_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<bool> {
        self.requires_authenticated_user()?;
        let result = sqlx::query("DELETE FROM shipments WHERE invoice_number = $1")
            .bind(invoice.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_box(&self, id: &str) -> StoreResult<Option<ShipmentBox>> {
        self.requires_authenticated_user()?;
        let sql = format!("SELECT {} FROM boxes WHERE id = $1", BOX_COLUMNS);
        let row = sqlx::query_as::<_, BoxRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ShipmentBox::try_from)
            .transpose()
            .map_err(decode_failed)
    }

    async fn get_boxes(&self, invoice: &InvoiceNumber) -> StoreResult<Vec<ShipmentBox>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM boxes WHERE invoice_number = $1 ORDER BY created_at, box_number, id",
            BOX_COLUMNS
        );
        let rows = sqlx::query_as::<_, BoxRow>(&sql)
            .bind(invoice.as_str())
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows).map_err(decode_failed)
    }

    async fn list_boxes(&self) -> StoreResult<Vec<ShipmentBox>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM boxes ORDER BY invoice_number, created_at, id",
            BOX_COLUMNS
        );
        let rows = sqlx::query_as::<_, BoxRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows).map_err(decode_failed)
    }

    async fn upsert_box(&self, record: &ShipmentBox) -> StoreResult<()> {
        self.requires_authenticated_user()?;
        debug!(box_id = %record.id, "Remote upsert box");

        sqlx::query(
            r#"
            INSERT INTO boxes (
                id, invoice_number, box_number, length_cm, width_cm, height_cm,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                invoice_number = EXCLUDED.invoice_number,
                box_number = EXCLUDED.box_number,
                length_cm = EXCLUDED.length_cm,
                width_cm = EXCLUDED.width_cm,
                height_cm = EXCLUDED.height_cm,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(record.invoice_number.as_str())
        .bind(&record.box_number)
        .bind(i64::from(record.dimensions.length_cm))
        .bind(i64::from(record.dimensions.width_cm))
        .bind(i64::from(record.dimensions.height_cm))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_box(&self, id: &str) -> StoreResult<bool> {
        self.requires_authenticated_user()?;
        let result = sqlx::query("DELETE FROM boxes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        self.requires_authenticated_user()?;
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose().map_err(decode_failed)
    }

    async fn get_products(&self, box_id: &str) -> StoreResult<Vec<Product>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM products WHERE box_id = $1 ORDER BY created_at, id",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(box_id)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows).map_err(decode_failed)
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM products ORDER BY box_id, created_at, id",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows).map_err(decode_failed)
    }

    async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
        self.requires_authenticated_user()?;
        debug!(product_id = %product.id, box_id = %product.box_id, "Remote upsert product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, box_id, product_type, description, weight_grams, rate_cents,
                quantity, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                box_id = EXCLUDED.box_id,
                product_type = EXCLUDED.product_type,
                description = EXCLUDED.description,
                weight_grams = EXCLUDED.weight_grams,
                rate_cents = EXCLUDED.rate_cents,
                quantity = EXCLUDED.quantity,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.box_id)
        .bind(&product.product_type)
        .bind(&product.description)
        .bind(product.weight.grams())
        .bind(product.rate.cents())
        .bind(i64::from(product.quantity))
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_product(&self, id: &str) -> StoreResult<bool> {
        self.requires_authenticated_user()?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_master_records(&self) -> StoreResult<Vec<MasterRecord>> {
        self.requires_authenticated_user()?;
        let sql = format!(
            "SELECT {} FROM master_records ORDER BY kind, code, id",
            MASTER_COLUMNS
        );
        let rows = sqlx::query_as::<_, MasterRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        convert_all(rows).map_err(decode_failed)
    }

    async fn upsert_master_record(&self, record: &MasterRecord) -> StoreResult<()> {
        self.requires_authenticated_user()?;
        sqlx::query(
            r#"
            INSERT INTO master_records (id, kind, code, name, details, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                kind = EXCLUDED.kind,
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                details = EXCLUDED.details,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(record.kind.as_str())
        .bind(&record.code)
        .bind(&record.name)
        .bind(&record.details)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Same two-step sweep as the local store, in one transaction.
    async fn delete_orphans(&self) -> StoreResult<OrphanCounts> {
        self.requires_authenticated_user()?;
        let mut tx = self.pool.begin().await?;

        let boxes = sqlx::query(
            "DELETE FROM boxes b WHERE NOT EXISTS \
             (SELECT 1 FROM shipments s WHERE s.invoice_number = b.invoice_number)",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let products = sqlx::query(
            "DELETE FROM products p WHERE NOT EXISTS (SELECT 1 FROM boxes b WHERE b.id = p.box_id)",
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(OrphanCounts { boxes, products })
    }
}
