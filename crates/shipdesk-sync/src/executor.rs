//! # Reconciliation Executor
//!
//! Applies a submitted shipment tree to both stores.
//!
//! ## One Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(shipment, boxes)                                            │
//! │       │                                                                 │
//! │       ├── validate                      ← nothing written on rejection │
//! │       ├── load boxes + products         ← local store only             │
//! │       ├── check submitted ids aren't owned by another parent           │
//! │       ├── upsert shipment                                              │
//! │       ├── diff_children at box level                                   │
//! │       │                                                                 │
//! │       ├── to_update: upsert box if label/dimensions changed,           │
//! │       │              then reconcile its products                       │
//! │       ├── to_add:    mint id, upsert box, add its products             │
//! │       ├── to_delete: delete products, then the box                     │
//! │       │                                                                 │
//! │       └── local orphan sweep                                           │
//! │                                                                         │
//! │  Every write: local first (fatal on failure),                          │
//! │               then remote while the leg is up (recorded on failure)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A product may move between boxes of the same shipment by submitting its
//! id under the new box. It is written as an add there and left out of the
//! old box's deletes. Ids owned by another shipment are rejected.
//!
//! ## Remote Parents
//! The remote never gets a child whose parent it failed to take:
//! - children of a parent whose remote upsert failed are not sent
//! - a box whose products change is re-sent before them, since the remote
//!   may never have seen it (first saved offline)
//! - a parent is not deleted remotely while any of its remote children
//!   failed to delete

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use shipdesk_core::validation::{validate_boxes, validate_shipment};
use shipdesk_core::{
    diff_children, new_record_id, BoxInput, BoxTree, ChildSet, InvoiceNumber, Product,
    ProductInput, Shipment, ShipmentBox, ShipmentStatus, ValidationError,
};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityOracle;
use crate::error::{SyncError, SyncResult};
use crate::leg::RemoteLeg;
use crate::outcome::ReconcileResult;
use crate::store::{LocalStore, RemoteStore};
use crate::sweeper::{OrphanSweeper, SweepScope};

/// Bound on each remote operation unless configured otherwise.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// State carried through one pass.
struct Pass {
    leg: RemoteLeg,
    result: ReconcileResult,
    now: DateTime<Utc>,
    /// False once the remote shipment upsert failed.
    shipment_mirrored: bool,
    /// Boxes whose remote upsert failed; their products stay local.
    unmirrored_boxes: HashSet<String>,
}

pub struct ReconciliationExecutor {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    oracle: Arc<dyn ConnectivityOracle>,
    op_timeout: Duration,
}

impl ReconciliationExecutor {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
    ) -> Self {
        ReconciliationExecutor {
            local,
            remote,
            oracle,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn from_config(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
        config: &SyncConfig,
    ) -> Self {
        Self::new(local, remote, oracle).with_op_timeout(config.op_timeout())
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    fn begin(&self, invoice: InvoiceNumber) -> Pass {
        Pass {
            leg: RemoteLeg::open(self.remote.clone(), self.oracle.clone(), self.op_timeout),
            result: ReconcileResult::new(invoice),
            now: Utc::now(),
            shipment_mirrored: true,
            unmirrored_boxes: HashSet::new(),
        }
    }

    fn sweeper(&self) -> OrphanSweeper {
        OrphanSweeper::new(
            self.local.clone(),
            self.remote.clone(),
            self.oracle.clone(),
            self.op_timeout,
        )
    }

    // =========================================================================
    // Caller-facing Operations
    // =========================================================================

    /// Reconciles one shipment and its submitted boxes against both stores.
    ///
    /// The shipment record is upserted on every pass. With
    /// `ChildSet::Untouched` nothing else is written.
    /// `ChildSet::Replace(vec![])` deletes every box.
    ///
    /// ## Errors
    /// - [`SyncError::Validation`] before anything is written, including
    ///   for a box or product id that belongs to another shipment
    /// - [`SyncError::LocalUnavailable`] when a local write fails
    /// - [`SyncError::DeleteIncomplete`] when local child deletes failed;
    ///   everything else in the pass was still applied and is carried in
    ///   the error
    pub async fn reconcile(
        &self,
        mut shipment: Shipment,
        boxes: ChildSet<BoxInput>,
    ) -> SyncResult<ReconcileResult> {
        validate_shipment(&shipment)?;
        validate_boxes(&boxes)?;

        let invoice = shipment.invoice_number.clone();
        info!(
            invoice = %invoice,
            boxes = boxes.items().map(<[BoxInput]>::len),
            "Reconciling shipment"
        );

        let current = self
            .local
            .get_shipment(&invoice)
            .await
            .map_err(|e| SyncError::local(format_args!("read shipment {invoice}"), e))?;

        let existing = match boxes.items() {
            Some(submitted) => {
                let existing = self.load_box_trees(&invoice).await?;
                self.check_ownership(&invoice, &existing, submitted).await?;
                Some(existing)
            }
            None => None,
        };

        let mut pass = self.begin(invoice.clone());

        // Header is always written; only its timestamp depends on content
        match current {
            Some(current) if current.same_content(&shipment) => {
                shipment.created_at = current.created_at;
                shipment.updated_at = current.updated_at;
            }
            Some(current) => {
                shipment.created_at = current.created_at;
                shipment.updated_at = pass.now;
            }
            None => shipment.updated_at = pass.now,
        }
        self.write_shipment(&mut pass, &shipment).await?;

        if let (Some(submitted), Some(existing)) = (boxes.items(), existing) {
            self.apply_boxes(&mut pass, &invoice, &existing, submitted)
                .await?;

            let sweep = self.sweeper().sweep(SweepScope::Local).await?;
            pass.result.orphans = sweep.local.unwrap_or_default();
        }

        self.finish(pass)
    }

    /// Sets the status of an existing shipment on both legs. No diffing.
    ///
    /// Returns `None` when the shipment isn't in the local store.
    pub async fn update_status(
        &self,
        invoice: &InvoiceNumber,
        status: ShipmentStatus,
    ) -> SyncResult<Option<ReconcileResult>> {
        let current = self
            .local
            .get_shipment(invoice)
            .await
            .map_err(|e| SyncError::local(format_args!("read shipment {invoice}"), e))?;

        let Some(mut shipment) = current else {
            debug!(invoice = %invoice, "Status update for unknown shipment");
            return Ok(None);
        };

        let mut pass = self.begin(invoice.clone());
        info!(invoice = %invoice, from = %shipment.status, to = %status, "Updating status");

        shipment.status = status;
        shipment.updated_at = pass.now;
        self.write_shipment(&mut pass, &shipment).await?;

        self.finish(pass).map(Some)
    }

    /// Deletes a shipment with its boxes and products from both legs.
    ///
    /// Products go first, then boxes, then the shipment. A remote sweep
    /// follows to catch remote children the local store never knew about.
    pub async fn delete_shipment(&self, invoice: &InvoiceNumber) -> SyncResult<ReconcileResult> {
        let mut pass = self.begin(invoice.clone());
        info!(invoice = %invoice, "Deleting shipment");

        let trees = self.load_box_trees(invoice).await?;
        let keep = HashSet::new();
        let mut remote_kept = 0;
        for tree in &trees {
            if !self.delete_box_tree(&mut pass, tree, &keep).await {
                remote_kept += 1;
            }
        }

        if pass.result.failed_deletes > 0 {
            warn!(
                invoice = %invoice,
                failed = pass.result.failed_deletes,
                "Keeping shipment, some children could not be deleted"
            );
        } else {
            self.local
                .delete_shipment(invoice)
                .await
                .map_err(|e| SyncError::local(format_args!("delete shipment {invoice}"), e))?;

            if remote_kept > 0 {
                warn!(
                    invoice = %invoice,
                    boxes = remote_kept,
                    "Keeping remote shipment, some remote boxes could not be deleted"
                );
            } else if let Some(remote) = pass.leg.active() {
                pass.leg
                    .call(
                        format!("delete shipment {invoice}"),
                        remote.delete_shipment(invoice),
                    )
                    .await;
            }
        }

        let sweep = self.sweeper().sweep(SweepScope::Local).await?;
        pass.result.orphans = sweep.local.unwrap_or_default();

        if let Some(remote) = pass.leg.active() {
            pass.result.remote_orphans = pass
                .leg
                .call("remote orphan sweep", remote.delete_orphans())
                .await;
        }

        self.finish(pass)
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Rejects submitted ids that another shipment already owns.
    ///
    /// Ids of this shipment's own boxes and products pass, as do ids of
    /// parentless rows, which the submission adopts.
    async fn check_ownership(
        &self,
        invoice: &InvoiceNumber,
        existing: &[BoxTree],
        submitted: &[BoxInput],
    ) -> SyncResult<()> {
        let own_boxes: HashSet<&str> = existing.iter().map(|t| t.record.id.as_str()).collect();
        let own_products: HashSet<&str> = existing
            .iter()
            .flat_map(|t| t.products.iter())
            .map(|p| p.id.as_str())
            .collect();

        for input in submitted {
            if let Some(id) = input.submitted_id().filter(|id| !own_boxes.contains(id)) {
                if let Some(owner) = self.owning_shipment_of_box(id).await? {
                    if owner != *invoice {
                        return Err(ValidationError::foreign_id(
                            "box id",
                            id,
                            format!("shipment {owner}"),
                        )
                        .into());
                    }
                }
            }

            for product in input.products.items().unwrap_or_default() {
                let Some(id) = product.submitted_id() else {
                    continue;
                };
                if own_products.contains(id) {
                    continue;
                }

                let found = self
                    .local
                    .get_product(id)
                    .await
                    .map_err(|e| SyncError::local(format_args!("read product {id}"), e))?;
                let Some(found) = found else {
                    continue;
                };
                if let Some(owner) = self.owning_shipment_of_box(&found.box_id).await? {
                    if owner != *invoice {
                        return Err(ValidationError::foreign_id(
                            "product id",
                            id,
                            format!("box {} of shipment {owner}", found.box_id),
                        )
                        .into());
                    }
                }
            }
        }

        Ok(())
    }

    /// The shipment a local box belongs to, if both exist.
    async fn owning_shipment_of_box(&self, box_id: &str) -> SyncResult<Option<InvoiceNumber>> {
        let record = self
            .local
            .get_box(box_id)
            .await
            .map_err(|e| SyncError::local(format_args!("read box {box_id}"), e))?;
        let Some(record) = record else {
            return Ok(None);
        };

        let parent = self
            .local
            .get_shipment(&record.invoice_number)
            .await
            .map_err(|e| {
                SyncError::local(format_args!("read shipment {}", record.invoice_number), e)
            })?;
        Ok(parent.map(|s| s.invoice_number))
    }

    // =========================================================================
    // Box Level
    // =========================================================================

    async fn load_box_trees(&self, invoice: &InvoiceNumber) -> SyncResult<Vec<BoxTree>> {
        let boxes = self
            .local
            .get_boxes(invoice)
            .await
            .map_err(|e| SyncError::local(format_args!("read boxes of {invoice}"), e))?;

        let mut trees = Vec::with_capacity(boxes.len());
        for record in boxes {
            let products = self
                .local
                .get_products(&record.id)
                .await
                .map_err(|e| SyncError::local(format_args!("read products of box {}", record.id), e))?;
            trees.push(BoxTree { record, products });
        }

        Ok(trees)
    }

    async fn apply_boxes(
        &self,
        pass: &mut Pass,
        invoice: &InvoiceNumber,
        existing: &[BoxTree],
        submitted: &[BoxInput],
    ) -> SyncResult<()> {
        let diff = diff_children(existing, submitted.iter());
        debug!(
            invoice = %invoice,
            update = diff.to_update.len(),
            add = diff.to_add.len(),
            delete = diff.to_delete.len(),
            unchanged = diff.unchanged.len(),
            "Box diff"
        );

        // Product ids claimed anywhere in the submission survive every delete
        let keep: HashSet<&str> = submitted
            .iter()
            .filter_map(|b| b.products.items())
            .flatten()
            .filter_map(ProductInput::submitted_id)
            .collect();

        let known: HashMap<&str, &Product> = existing
            .iter()
            .flat_map(|tree| tree.products.iter())
            .map(|p| (p.id.as_str(), p))
            .collect();

        for matched in &diff.to_update {
            let tree = &matched.existing;
            let input = matched.submitted;

            let written = input.metadata_differs_from(&tree.record);
            if written {
                let record = input.to_record(
                    tree.record.id.clone(),
                    invoice,
                    tree.record.created_at,
                    pass.now,
                );
                self.write_box(pass, &record).await?;
            }
            pass.result.boxes.updated += 1;

            if let Some(products) = input.products.items() {
                self.apply_products(pass, tree, !written, products, &keep, &known)
                    .await?;
            }
        }

        for input in &diff.to_add {
            let id = input
                .submitted_id()
                .map(str::to_string)
                .unwrap_or_else(new_record_id);
            let record = input.to_record(id, invoice, pass.now, pass.now);
            self.write_box(pass, &record).await?;
            pass.result.boxes.added += 1;

            for product in input.products.items().unwrap_or_default() {
                self.add_product(pass, &record.id, product, &known).await?;
            }
        }

        for tree in &diff.to_delete {
            self.delete_box_tree(pass, tree, &keep).await;
        }

        Ok(())
    }

    /// Deletes a box's products, then the box unless a product delete failed.
    ///
    /// Local failures are counted, never returned. A remote product delete
    /// failure keeps the remote box. Returns false when the box is still
    /// on the remote because of a failure.
    async fn delete_box_tree(&self, pass: &mut Pass, tree: &BoxTree, keep: &HashSet<&str>) -> bool {
        let before = pass.result.failed_deletes;
        let mut remote_kept = 0;
        for product in &tree.products {
            if keep.contains(product.id.as_str()) {
                debug!(product_id = %product.id, "Product moved to another box");
                continue;
            }
            if !self.delete_product(pass, product).await {
                remote_kept += 1;
            }
        }

        if pass.result.failed_deletes > before {
            warn!(box_id = %tree.record.id, "Keeping box, some products could not be deleted");
            return remote_kept == 0;
        }

        match self.local.delete_box(&tree.record.id).await {
            Ok(_) => {
                pass.result.boxes.deleted += 1;
                if remote_kept > 0 {
                    warn!(
                        box_id = %tree.record.id,
                        products = remote_kept,
                        "Keeping remote box, some remote products could not be deleted"
                    );
                    return false;
                }
                match pass.leg.active() {
                    Some(remote) => pass
                        .leg
                        .call(
                            format!("delete box {}", tree.record.id),
                            remote.delete_box(&tree.record.id),
                        )
                        .await
                        .is_some(),
                    None => true,
                }
            }
            Err(err) => {
                error!(box_id = %tree.record.id, error = %err, "Local box delete failed");
                pass.result.failed_deletes += 1;
                true
            }
        }
    }

    // =========================================================================
    // Product Level
    // =========================================================================

    /// Updates, then adds, then deletes, all scoped to one box.
    ///
    /// With `resend_parent` the box record goes to the remote again before
    /// the first product change.
    async fn apply_products(
        &self,
        pass: &mut Pass,
        tree: &BoxTree,
        resend_parent: bool,
        submitted: &[ProductInput],
        keep: &HashSet<&str>,
        known: &HashMap<&str, &Product>,
    ) -> SyncResult<()> {
        let box_id = tree.record.id.as_str();
        let diff = diff_children(tree.products.as_slice(), submitted.iter());
        if diff.is_noop() {
            return Ok(());
        }

        debug!(
            box_id,
            update = diff.to_update.len(),
            add = diff.to_add.len(),
            delete = diff.to_delete.len(),
            "Product diff"
        );

        if resend_parent {
            self.mirror_box(pass, &tree.record).await;
        }

        for matched in &diff.to_update {
            let record = matched.submitted.to_record(
                matched.existing.id.clone(),
                box_id,
                matched.existing.created_at,
                pass.now,
            );
            self.write_product(pass, &record).await?;
            pass.result.products.updated += 1;
        }

        for input in &diff.to_add {
            self.add_product(pass, box_id, input, known).await?;
        }

        for product in &diff.to_delete {
            if keep.contains(product.id.as_str()) {
                debug!(product_id = %product.id, "Product moved to another box");
                continue;
            }
            self.delete_product(pass, product).await;
        }

        Ok(())
    }

    async fn add_product(
        &self,
        pass: &mut Pass,
        box_id: &str,
        input: &ProductInput,
        known: &HashMap<&str, &Product>,
    ) -> SyncResult<()> {
        let id = input
            .submitted_id()
            .map(str::to_string)
            .unwrap_or_else(new_record_id);
        let created_at = known.get(id.as_str()).map_or(pass.now, |p| p.created_at);

        let record = input.to_record(id, box_id, created_at, pass.now);
        self.write_product(pass, &record).await?;
        pass.result.products.added += 1;
        Ok(())
    }

    /// Returns false when the remote delete was attempted and failed.
    async fn delete_product(&self, pass: &mut Pass, product: &Product) -> bool {
        match self.local.delete_product(&product.id).await {
            Ok(_) => {
                pass.result.products.deleted += 1;
                match pass.leg.active() {
                    Some(remote) => pass
                        .leg
                        .call(
                            format!("delete product {}", product.id),
                            remote.delete_product(&product.id),
                        )
                        .await
                        .is_some(),
                    None => true,
                }
            }
            Err(err) => {
                error!(product_id = %product.id, error = %err, "Local product delete failed");
                pass.result.failed_deletes += 1;
                true
            }
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    async fn write_shipment(&self, pass: &mut Pass, shipment: &Shipment) -> SyncResult<()> {
        let invoice = &shipment.invoice_number;
        self.local
            .upsert_shipment(shipment)
            .await
            .map_err(|e| SyncError::local(format_args!("upsert shipment {invoice}"), e))?;

        if let Some(remote) = pass.leg.active() {
            pass.shipment_mirrored = pass
                .leg
                .call(
                    format!("upsert shipment {invoice}"),
                    remote.upsert_shipment(shipment),
                )
                .await
                .is_some();
        }
        Ok(())
    }

    async fn write_box(&self, pass: &mut Pass, record: &ShipmentBox) -> SyncResult<()> {
        self.local
            .upsert_box(record)
            .await
            .map_err(|e| SyncError::local(format_args!("upsert box {}", record.id), e))?;

        self.mirror_box(pass, record).await;
        Ok(())
    }

    /// Remote half of a box upsert.
    async fn mirror_box(&self, pass: &mut Pass, record: &ShipmentBox) {
        if !pass.shipment_mirrored {
            pass.unmirrored_boxes.insert(record.id.clone());
            return;
        }
        let Some(remote) = pass.leg.active() else {
            return;
        };

        let sent = pass
            .leg
            .call(format!("upsert box {}", record.id), remote.upsert_box(record))
            .await;
        if sent.is_none() {
            pass.unmirrored_boxes.insert(record.id.clone());
        }
    }

    async fn write_product(&self, pass: &mut Pass, record: &Product) -> SyncResult<()> {
        self.local
            .upsert_product(record)
            .await
            .map_err(|e| SyncError::local(format_args!("upsert product {}", record.id), e))?;

        if pass.unmirrored_boxes.contains(&record.box_id) {
            debug!(
                product_id = %record.id,
                box_id = %record.box_id,
                "Remote box missing, product kept local"
            );
            return Ok(());
        }
        if let Some(remote) = pass.leg.active() {
            pass.leg
                .call(
                    format!("upsert product {}", record.id),
                    remote.upsert_product(record),
                )
                .await;
        }
        Ok(())
    }

    fn finish(&self, pass: Pass) -> SyncResult<ReconcileResult> {
        let Pass { leg, mut result, .. } = pass;
        result.remote_applied = leg.applied();
        result.remote_issues = leg.into_issues();

        if result.failed_deletes > 0 {
            warn!(
                invoice = %result.invoice,
                failed = result.failed_deletes,
                "Pass finished with failed local deletes"
            );
            return Err(SyncError::DeleteIncomplete {
                failed: result.failed_deletes,
                result: Box::new(result),
            });
        }

        result.local_applied = true;
        info!(
            invoice = %result.invoice,
            boxes = ?result.boxes,
            products = ?result.products,
            remote_applied = result.remote_applied,
            "Pass complete"
        );
        Ok(result)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityFlag;
    use shipdesk_core::{Dimensions, Money, ValidationError, Weight};
    use shipdesk_db::{Database, DbConfig};

    async fn local_only() -> (Database, ReconciliationExecutor) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let executor = ReconciliationExecutor::new(
            Arc::new(db.clone()),
            None,
            Arc::new(ConnectivityFlag::offline()),
        );
        (db, executor)
    }

    fn shipment(raw: &str) -> Shipment {
        let mut s = Shipment::new(InvoiceNumber::parse(raw).unwrap(), Utc::now());
        s.origin = "SKT".into();
        s.destination = "LHR".into();
        s
    }

    fn product(kind: &str, grams: i64) -> ProductInput {
        ProductInput::new(kind, "", Weight::from_grams(grams), Money::from_cents(500), 1)
    }

    #[tokio::test]
    async fn test_new_tree_mints_ids() {
        let (db, executor) = local_only().await;
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::new(40, 30, 20))
                .with_products(vec![product("DOCS", 100), product("GARMENTS", 900)]),
            BoxInput::new("2", Dimensions::new(10, 10, 10)),
        ]);

        let result = executor.reconcile(shipment("inv-1"), boxes).await.unwrap();
        assert!(result.local_applied);
        assert!(!result.remote_applied);
        assert_eq!(result.boxes.added, 2);
        assert_eq!(result.products.added, 2);

        let invoice = InvoiceNumber::parse("INV-1").unwrap();
        let stored = db.boxes().for_shipment(&invoice).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|b| !b.id.is_empty()));
    }

    #[tokio::test]
    async fn test_untouched_boxes_keep_children() {
        let (db, executor) = local_only().await;
        let boxes = ChildSet::replace(vec![BoxInput::new("1", Dimensions::new(1, 1, 1))]);
        executor.reconcile(shipment("INV-2"), boxes).await.unwrap();

        let mut edited = shipment("INV-2");
        edited.carrier = Some("DHL".into());
        let result = executor.reconcile(edited, ChildSet::Untouched).await.unwrap();

        assert!(result.is_noop());
        assert_eq!(db.boxes().list_all().await.unwrap().len(), 1);
        let stored = db
            .shipments()
            .get(&InvoiceNumber::parse("INV-2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.carrier.as_deref(), Some("DHL"));
    }

    #[tokio::test]
    async fn test_empty_replace_deletes_everything() {
        let (db, executor) = local_only().await;
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::new(1, 1, 1)).with_products(vec![product("DOCS", 1)])
        ]);
        executor.reconcile(shipment("INV-3"), boxes).await.unwrap();

        let result = executor
            .reconcile(shipment("INV-3"), ChildSet::replace(Vec::new()))
            .await
            .unwrap();
        assert_eq!(result.boxes.deleted, 1);
        assert_eq!(result.products.deleted, 1);
        assert!(db.boxes().list_all().await.unwrap().is_empty());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_blocks_all_writes() {
        let (db, executor) = local_only().await;
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::default()).with_id("B1"),
            BoxInput::new("2", Dimensions::default()).with_id("B1"),
        ]);

        let err = executor.reconcile(shipment("INV-4"), boxes).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::Duplicate { .. })
        ));
        assert_eq!(db.shipments().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_product_moves_between_boxes() {
        let (db, executor) = local_only().await;
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::default())
                .with_id("B1")
                .with_products(vec![product("DOCS", 100).with_id("P1")]),
            BoxInput::new("2", Dimensions::default()).with_id("B2"),
        ]);
        executor.reconcile(shipment("INV-5"), boxes).await.unwrap();

        let moved = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::default())
                .with_id("B1")
                .with_products(Vec::new()),
            BoxInput::new("2", Dimensions::default())
                .with_id("B2")
                .with_products(vec![product("DOCS", 100).with_id("P1")]),
        ]);
        let result = executor.reconcile(shipment("INV-5"), moved).await.unwrap();

        assert_eq!(result.products.deleted, 0);
        let p1 = db.products().get("P1").await.unwrap().unwrap();
        assert_eq!(p1.box_id, "B2");
    }

    #[tokio::test]
    async fn test_update_status() {
        let (db, executor) = local_only().await;
        executor
            .reconcile(shipment("INV-6"), ChildSet::Untouched)
            .await
            .unwrap();

        let invoice = InvoiceNumber::parse("INV-6").unwrap();
        let result = executor
            .update_status(&invoice, ShipmentStatus::Delivered)
            .await
            .unwrap();
        assert!(result.is_some());

        let stored = db.shipments().get(&invoice).await.unwrap().unwrap();
        assert_eq!(stored.status, ShipmentStatus::Delivered);

        let missing = InvoiceNumber::parse("NOPE").unwrap();
        assert!(executor
            .update_status(&missing, ShipmentStatus::Cancelled)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_shipment_cascades() {
        let (db, executor) = local_only().await;
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::default())
                .with_products(vec![product("DOCS", 1), product("DOCS", 2)]),
            BoxInput::new("2", Dimensions::default()).with_products(vec![product("DOCS", 3)]),
        ]);
        executor.reconcile(shipment("INV-7"), boxes).await.unwrap();

        let invoice = InvoiceNumber::parse("INV-7").unwrap();
        let result = executor.delete_shipment(&invoice).await.unwrap();

        assert_eq!(result.boxes.deleted, 2);
        assert_eq!(result.products.deleted, 3);
        assert!(db.shipments().get(&invoice).await.unwrap().is_none());
        assert!(db.boxes().list_all().await.unwrap().is_empty());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }
}
