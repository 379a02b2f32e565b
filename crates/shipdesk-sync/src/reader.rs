//! # Shipment Reader
//!
//! Read path for shipment trees.
//!
//! `ReadMode::LocalOnly` never touches the network. `ReadMode::PreferRemote`
//! asks the remote first and falls back to the local copy whenever the
//! remote is offline, nobody is signed in, a call fails, or the remote has
//! no such shipment.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use shipdesk_core::{InvoiceNumber, Shipment, ShipmentTree};

use crate::connectivity::{ConnectivityOracle, ReadMode};
use crate::error::{SyncError, SyncResult};
use crate::executor::DEFAULT_OP_TIMEOUT;
use crate::leg::RemoteLeg;
use crate::store::{LocalStore, RemoteStore};

pub struct ShipmentReader {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    oracle: Arc<dyn ConnectivityOracle>,
    op_timeout: Duration,
}

impl ShipmentReader {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
    ) -> Self {
        ShipmentReader {
            local,
            remote,
            oracle,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Loads one shipment with its boxes and products.
    pub async fn load_tree(
        &self,
        invoice: &InvoiceNumber,
        mode: ReadMode,
    ) -> SyncResult<Option<ShipmentTree>> {
        if mode == ReadMode::PreferRemote {
            if let Some(tree) = self.remote_tree(invoice).await {
                debug!(%invoice, "Loaded shipment from remote");
                return Ok(Some(tree));
            }
        }

        self.local_tree(invoice).await
    }

    /// Lists shipment headers, newest first.
    pub async fn list_shipments(&self, mode: ReadMode) -> SyncResult<Vec<Shipment>> {
        if mode == ReadMode::PreferRemote {
            let mut leg = self.leg();
            if let Some(remote) = leg.active() {
                if let Some(shipments) = leg.call("list shipments", remote.list_shipments()).await {
                    return Ok(shipments);
                }
            }
            debug!(issues = ?leg.into_issues(), "Falling back to local shipment list");
        }

        self.local
            .list_shipments()
            .await
            .map_err(|e| SyncError::local("list shipments", e))
    }

    fn leg(&self) -> RemoteLeg {
        RemoteLeg::open(self.remote.clone(), self.oracle.clone(), self.op_timeout)
    }

    async fn remote_tree(&self, invoice: &InvoiceNumber) -> Option<ShipmentTree> {
        let mut leg = self.leg();
        let remote = leg.active()?;

        let shipment = leg
            .call(
                format!("read shipment {invoice}"),
                remote.get_shipment(invoice),
            )
            .await
            .flatten()?;
        let boxes = leg
            .call(format!("read boxes {invoice}"), remote.get_boxes(invoice))
            .await?;

        let mut products = Vec::new();
        for record in &boxes {
            let mut found = leg
                .call(
                    format!("read products {}", record.id),
                    remote.get_products(&record.id),
                )
                .await?;
            products.append(&mut found);
        }

        Some(ShipmentTree::assemble(shipment, boxes, products))
    }

    async fn local_tree(&self, invoice: &InvoiceNumber) -> SyncResult<Option<ShipmentTree>> {
        let local = self.local.as_ref();

        let Some(shipment) = local
            .get_shipment(invoice)
            .await
            .map_err(|e| SyncError::local(format_args!("read shipment {invoice}"), e))?
        else {
            return Ok(None);
        };

        let boxes = local
            .get_boxes(invoice)
            .await
            .map_err(|e| SyncError::local(format_args!("read boxes {invoice}"), e))?;

        let mut products = Vec::new();
        for record in &boxes {
            let mut found = local
                .get_products(&record.id)
                .await
                .map_err(|e| SyncError::local(format_args!("read products {}", record.id), e))?;
            products.append(&mut found);
        }

        Ok(Some(ShipmentTree::assemble(shipment, boxes, products)))
    }
}
