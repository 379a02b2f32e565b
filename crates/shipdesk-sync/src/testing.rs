//! In-process stores for engine tests.
//!
//! [`MemoryRemote`] stands in for Postgres with a call log, a sign-in
//! switch and per-operation fault injection. [`FlakyLocal`] wraps a real
//! in-memory SQLite database and fails deletes of chosen ids.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use shipdesk_core::{
    BoxInput, ChildSet, Dimensions, InvoiceNumber, MasterKind, MasterRecord, Money, OrphanCounts,
    Product, ProductInput, Shipment, ShipmentBox, Weight,
};
use shipdesk_db::{Database, DbConfig};

use crate::error::{StoreError, StoreResult};
use crate::store::{LocalStore, RemoteStore, ShipmentStore};

// =============================================================================
// Fixtures
// =============================================================================

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) fn invoice(raw: &str) -> InvoiceNumber {
    InvoiceNumber::parse(raw).unwrap()
}

pub(crate) fn shipment(raw: &str) -> Shipment {
    let mut s = Shipment::new(invoice(raw), Utc::now());
    s.origin = "SKT".into();
    s.destination = "LHR".into();
    s
}

pub(crate) fn product(id: &str, kind: &str, grams: i64) -> ProductInput {
    ProductInput::new(kind, "", Weight::from_grams(grams), Money::from_cents(500), 1).with_id(id)
}

pub(crate) fn boxed(id: &str, number: &str, products: Vec<ProductInput>) -> BoxInput {
    BoxInput::new(number, Dimensions::new(40, 30, 20))
        .with_id(id)
        .with_products(products)
}

/// Shipment `raw` with B1 {P1, P2} and B2 {P3}.
pub(crate) fn two_box_tree() -> ChildSet<BoxInput> {
    ChildSet::replace(vec![
        boxed(
            "B1",
            "1",
            vec![product("P1", "DOCS", 100), product("P2", "GARMENTS", 300)],
        ),
        boxed("B2", "2", vec![product("P3", "LEATHER", 180)]),
    ])
}

pub(crate) fn master(id: &str, kind: MasterKind, code: &str) -> MasterRecord {
    MasterRecord {
        id: id.into(),
        kind,
        code: code.into(),
        name: code.to_lowercase(),
        details: None,
        updated_at: Utc::now(),
    }
}

// =============================================================================
// Memory Remote
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultKind {
    Unreachable,
    Backend,
    /// Never answers within any sane timeout.
    Hang,
}

struct Fault {
    op: &'static str,
    kind: FaultKind,
    remaining: usize,
}

#[derive(Default)]
struct RemoteState {
    shipments: BTreeMap<InvoiceNumber, Shipment>,
    boxes: BTreeMap<String, ShipmentBox>,
    products: BTreeMap<String, Product>,
    master: BTreeMap<String, MasterRecord>,
    calls: Vec<String>,
    faults: Vec<Fault>,
}

pub(crate) struct MemoryRemote {
    state: Mutex<RemoteState>,
    signed_in: AtomicBool,
}

impl MemoryRemote {
    pub(crate) fn new() -> Self {
        MemoryRemote {
            state: Mutex::new(RemoteState::default()),
            signed_in: AtomicBool::new(true),
        }
    }

    pub(crate) fn signed_out() -> Self {
        let remote = Self::new();
        remote.signed_in.store(false, Ordering::SeqCst);
        remote
    }

    /// Fails the next `times` calls of `op`.
    pub(crate) fn inject(&self, op: &'static str, kind: FaultKind, times: usize) {
        self.state.lock().unwrap().faults.push(Fault {
            op,
            kind,
            remaining: times,
        });
    }

    /// Every call so far as `"op key"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub(crate) fn has_shipment(&self, invoice: &InvoiceNumber) -> bool {
        self.state.lock().unwrap().shipments.contains_key(invoice)
    }

    pub(crate) fn shipment_record(&self, invoice: &InvoiceNumber) -> Option<Shipment> {
        self.state.lock().unwrap().shipments.get(invoice).cloned()
    }

    pub(crate) fn box_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().boxes.keys().cloned().collect()
    }

    pub(crate) fn product(&self, id: &str) -> Option<Product> {
        self.state.lock().unwrap().products.get(id).cloned()
    }

    pub(crate) fn product_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().products.keys().cloned().collect()
    }

    pub(crate) fn master_count(&self) -> usize {
        self.state.lock().unwrap().master.len()
    }

    /// Seeds rows directly, bypassing the call log.
    pub(crate) fn seed(&self, shipments: &[Shipment], boxes: &[ShipmentBox], products: &[Product]) {
        let mut state = self.state.lock().unwrap();
        for s in shipments {
            state.shipments.insert(s.invoice_number.clone(), s.clone());
        }
        for b in boxes {
            state.boxes.insert(b.id.clone(), b.clone());
        }
        for p in products {
            state.products.insert(p.id.clone(), p.clone());
        }
    }

    async fn enter(&self, op: &'static str, key: &str) -> StoreResult<()> {
        self.requires_authenticated_user()?;

        let fault = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("{op} {key}").trim_end().to_string());
            state
                .faults
                .iter_mut()
                .find(|f| f.op == op && f.remaining > 0)
                .map(|f| {
                    f.remaining -= 1;
                    f.kind
                })
        };

        match fault {
            None => Ok(()),
            Some(FaultKind::Unreachable) => Err(StoreError::Unreachable("injected".into())),
            Some(FaultKind::Backend) => Err(StoreError::Backend("injected".into())),
            Some(FaultKind::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ShipmentStore for MemoryRemote {
    async fn get_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<Option<Shipment>> {
        self.enter("get_shipment", invoice.as_str()).await?;
        Ok(self.state.lock().unwrap().shipments.get(invoice).cloned())
    }

    async fn list_shipments(&self) -> StoreResult<Vec<Shipment>> {
        self.enter("list_shipments", "").await?;
        Ok(self.state.lock().unwrap().shipments.values().cloned().collect())
    }

    async fn upsert_shipment(&self, shipment: &Shipment) -> StoreResult<()> {
        self.enter("upsert_shipment", shipment.invoice_number.as_str())
            .await?;
        self.state
            .lock()
            .unwrap()
            .shipments
            .insert(shipment.invoice_number.clone(), shipment.clone());
        Ok(())
    }

    async fn delete_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<bool> {
        self.enter("delete_shipment", invoice.as_str()).await?;
        Ok(self.state.lock().unwrap().shipments.remove(invoice).is_some())
    }

    async fn get_box(&self, id: &str) -> StoreResult<Option<ShipmentBox>> {
        self.enter("get_box", id).await?;
        Ok(self.state.lock().unwrap().boxes.get(id).cloned())
    }

    async fn get_boxes(&self, invoice: &InvoiceNumber) -> StoreResult<Vec<ShipmentBox>> {
        self.enter("get_boxes", invoice.as_str()).await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .boxes
            .values()
            .filter(|b| &b.invoice_number == invoice)
            .cloned()
            .collect())
    }

    async fn list_boxes(&self) -> StoreResult<Vec<ShipmentBox>> {
        self.enter("list_boxes", "").await?;
        Ok(self.state.lock().unwrap().boxes.values().cloned().collect())
    }

    async fn upsert_box(&self, record: &ShipmentBox) -> StoreResult<()> {
        self.enter("upsert_box", &record.id).await?;
        self.state
            .lock()
            .unwrap()
            .boxes
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_box(&self, id: &str) -> StoreResult<bool> {
        self.enter("delete_box", id).await?;
        Ok(self.state.lock().unwrap().boxes.remove(id).is_some())
    }

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        self.enter("get_product", id).await?;
        Ok(self.state.lock().unwrap().products.get(id).cloned())
    }

    async fn get_products(&self, box_id: &str) -> StoreResult<Vec<Product>> {
        self.enter("get_products", box_id).await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .products
            .values()
            .filter(|p| p.box_id == box_id)
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.enter("list_products", "").await?;
        Ok(self.state.lock().unwrap().products.values().cloned().collect())
    }

    async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
        self.enter("upsert_product", &product.id).await?;
        self.state
            .lock()
            .unwrap()
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> StoreResult<bool> {
        self.enter("delete_product", id).await?;
        Ok(self.state.lock().unwrap().products.remove(id).is_some())
    }

    async fn list_master_records(&self) -> StoreResult<Vec<MasterRecord>> {
        self.enter("list_master_records", "").await?;
        Ok(self.state.lock().unwrap().master.values().cloned().collect())
    }

    async fn upsert_master_record(&self, record: &MasterRecord) -> StoreResult<()> {
        self.enter("upsert_master_record", &record.id).await?;
        self.state
            .lock()
            .unwrap()
            .master
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_orphans(&self) -> StoreResult<OrphanCounts> {
        self.enter("delete_orphans", "").await?;
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let boxes_before = state.boxes.len();
        let shipments = &state.shipments;
        state.boxes.retain(|_, b| shipments.contains_key(&b.invoice_number));

        let products_before = state.products.len();
        let boxes = &state.boxes;
        state.products.retain(|_, p| boxes.contains_key(&p.box_id));

        Ok(OrphanCounts {
            boxes: (boxes_before - state.boxes.len()) as u64,
            products: (products_before - state.products.len()) as u64,
        })
    }
}

impl RemoteStore for MemoryRemote {
    fn requires_authenticated_user(&self) -> StoreResult<()> {
        if self.signed_in.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unauthorized)
        }
    }
}

// =============================================================================
// Flaky Local
// =============================================================================

/// SQLite store whose deletes of chosen ids fail. Records every mutation.
pub(crate) struct FlakyLocal {
    db: Database,
    failing: HashSet<String>,
    log: Mutex<Vec<String>>,
}

impl FlakyLocal {
    pub(crate) fn new(db: Database) -> Self {
        FlakyLocal {
            db,
            failing: HashSet::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_delete(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub(crate) fn mutations(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn check(&self, id: &str) -> StoreResult<()> {
        if self.failing.contains(id) {
            Err(StoreError::Unavailable(format!("disk refused delete of {id}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ShipmentStore for FlakyLocal {
    async fn get_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<Option<Shipment>> {
        self.db.get_shipment(invoice).await
    }

    async fn list_shipments(&self) -> StoreResult<Vec<Shipment>> {
        self.db.list_shipments().await
    }

    async fn upsert_shipment(&self, shipment: &Shipment) -> StoreResult<()> {
        self.record(format!("upsert_shipment {}", shipment.invoice_number));
        self.db.upsert_shipment(shipment).await
    }

    async fn delete_shipment(&self, invoice: &InvoiceNumber) -> StoreResult<bool> {
        self.record(format!("delete_shipment {invoice}"));
        self.db.delete_shipment(invoice).await
    }

    async fn get_box(&self, id: &str) -> StoreResult<Option<ShipmentBox>> {
        self.db.get_box(id).await
    }

    async fn get_boxes(&self, invoice: &InvoiceNumber) -> StoreResult<Vec<ShipmentBox>> {
        self.db.get_boxes(invoice).await
    }

    async fn list_boxes(&self) -> StoreResult<Vec<ShipmentBox>> {
        self.db.list_boxes().await
    }

    async fn upsert_box(&self, record: &ShipmentBox) -> StoreResult<()> {
        self.record(format!("upsert_box {}", record.id));
        self.db.upsert_box(record).await
    }

    async fn delete_box(&self, id: &str) -> StoreResult<bool> {
        self.record(format!("delete_box {id}"));
        self.check(id)?;
        self.db.delete_box(id).await
    }

    async fn get_product(&self, id: &str) -> StoreResult<Option<Product>> {
        self.db.get_product(id).await
    }

    async fn get_products(&self, box_id: &str) -> StoreResult<Vec<Product>> {
        self.db.get_products(box_id).await
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.db.list_products().await
    }

    async fn upsert_product(&self, product: &Product) -> StoreResult<()> {
        self.record(format!("upsert_product {}", product.id));
        self.db.upsert_product(product).await
    }

    async fn delete_product(&self, id: &str) -> StoreResult<bool> {
        self.record(format!("delete_product {id}"));
        self.check(id)?;
        self.db.delete_product(id).await
    }

    async fn list_master_records(&self) -> StoreResult<Vec<MasterRecord>> {
        self.db.list_master_records().await
    }

    async fn upsert_master_record(&self, record: &MasterRecord) -> StoreResult<()> {
        self.db.upsert_master_record(record).await
    }

    async fn delete_orphans(&self) -> StoreResult<OrphanCounts> {
        self.db.delete_orphans().await
    }
}

impl LocalStore for FlakyLocal {}
