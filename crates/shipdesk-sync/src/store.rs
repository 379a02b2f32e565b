//! # Store Interfaces
//!
//! The narrow interface the engine sees of each backend.
//!
//! ## Legs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ReconciliationExecutor / OrphanSweeper / SyncCoordinator              │
//! │           │                                   │                         │
//! │           ▼                                   ▼                         │
//! │  Arc<dyn LocalStore>                 Arc<dyn RemoteStore>              │
//! │  ├── always writable                 ├── gated by ConnectivityOracle   │
//! │  ├── failures are fatal              ├── requires a signed-in user     │
//! │  └── shipdesk_db::Database           └── PgRemoteStore (remote.rs)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both legs key records identically: shipments by normalized invoice
//! number, boxes and products by id. Every write is an upsert. Lookups
//! return `Option`; a missing row is not an error.

use async_trait::async_trait;
use shipdesk_core::{InvoiceNumber, MasterRecord, OrphanCounts, Product, Shipment, ShipmentBox};
use shipdesk_db::Database;

use crate::error::{StoreError, StoreResult};

/// Operations shared by the local and remote backends.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    // Shipments
    async fn get_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<Option<Shipment>>;
    async fn list_shipments(&self) -> StoreResult<Vec<Shipment>>;
    async fn upsert_shipment(&self, shipment: &Shipment) -> StoreResult<()>;
    /// Deletes the shipment row only. Returns true when a row was removed.
    async fn delete_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<bool>;

    // Boxes
    async fn get_box(&self, id: &str) -> StoreResult<Option<ShipmentBox>>;
    async fn get_boxes(&self, invoice: &InvoiceNumber) -> StoreResult<Vec<ShipmentBox>>;
    async fn list_boxes(&self) -> StoreResult<Vec<ShipmentBox>>;
    async fn upsert_box(&self, record: &ShipmentBox) -> StoreResult<()>;
    async fn delete_box(&self, id: &str) -> StoreResult<bool>;

    // Products
    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>>;
    async fn get_products(&self, box_id: &str) -> StoreResult<Vec<Product>>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn upsert_product(&self, product: &Product) -> StoreResult<()>;
    async fn delete_product(&self, id: &str) -> StoreResult<bool>;

    // Master data
    async fn list_master_records(&self) -> StoreResult<Vec<MasterRecord>>;
    async fn upsert_master_record(&self, record: &MasterRecord) -> StoreResult<()>;

    /// Deletes boxes without a shipment, then products without a box.
    async fn delete_orphans(&self) -> StoreResult<OrphanCounts>;
}

/// The canonical on-device store.
pub trait LocalStore: ShipmentStore {}

/// The optional cloud mirror.
pub trait RemoteStore: ShipmentStore {
    /// Fails with [`StoreError::Unauthorized`] unless a user is signed in.
    fn requires_authenticated_user(&self) -> StoreResult<()>;
}

// =============================================================================
// SQLite LocalStore
// =============================================================================

#[async_trait]
impl ShipmentStore for Database {
    async fn get_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<Option<Shipment>> {
        Ok(self.shipments().get(invoice).await?)
    }

    async fn list_shipments(&self) -> StoreResult<Vec<Shipment>> {
        Ok(self.shipments().list().await?)
    }

    async fn upsert_shipment(&self, shipment: &Shipment) -> StoreResult<()> {
        Ok(self.shipments().upsert(shipment).await?)
    }

    async fn delete_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<bool> {
        Ok(self.shipments().delete(invoice).await?)
    }

    async fn get_box(&self, id: &str) -> StoreResult<Option<ShipmentBox>> {
        Ok(self.boxes().get(id).await?)
    }

    async fn get_boxes(&self, invoice: &InvoiceNumber) -> StoreResult<Vec<ShipmentBox>> {
        Ok(self.boxes().for_shipment(invoice).await?)
    }

    async fn list_boxes(&self) -> StoreResult<Vec<ShipmentBox>> {
        Ok(self.boxes().list_all().await?)
    }

    async fn upsert_box(&self, record: &ShipmentBox) -> StoreResult<()> {
        Ok(self.boxes().upsert(record).await?)
    }

    async fn delete_box(&self, id: &str) -> StoreResult<bool> {
        Ok(self.boxes().delete(id).await?)
    }

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products().get(id).await?)
    }

    async fn get_products(&self, box_id: &str) -> StoreResult<Vec<Product>> {
        Ok(self.products().for_box(box_id).await?)
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.products().list_all().await?)
    }

    async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
        Ok(self.products().upsert(product).await?)
    }

    async fn delete_product(&self, id: &str) -> StoreResult<bool> {
        Ok(self.products().delete(id).await?)
    }

    async fn list_master_records(&self) -> StoreResult<Vec<MasterRecord>> {
        Ok(self.master_data().list(None).await?)
    }

    async fn upsert_master_record(&self, record: &MasterRecord) -> StoreResult<()> {
        Ok(self.master_data().upsert(record).await?)
    }

    async fn delete_orphans(&self) -> StoreResult<OrphanCounts> {
        self.maintenance()
            .delete_orphans()
            .await
            .map_err(StoreError::from)
    }
}

impl LocalStore for Database {}
