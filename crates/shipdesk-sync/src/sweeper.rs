//! # Orphan Sweeper
//!
//! Deletes boxes whose shipment is gone and products whose box is gone.
//!
//! ## When It Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::new            → local sweep on open (configurable)          │
//! │  reconcile (after deletes) → local sweep                                │
//! │  delete_shipment          → local + remote sweep                        │
//! │  `shipdesk sweep`         → any scope, on request                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sweeping is idempotent: a second sweep right after the first removes
//! nothing. A local failure is fatal; a remote one is reported in the
//! [`SweepReport`].

use serde::{Deserialize, Serialize};
use shipdesk_core::OrphanCounts;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::connectivity::ConnectivityOracle;
use crate::error::{SyncError, SyncResult};
use crate::leg::RemoteLeg;
use crate::store::{LocalStore, RemoteStore};

/// Which store(s) to sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepScope {
    Local,
    Remote,
    #[default]
    Both,
}

impl SweepScope {
    fn includes_local(self) -> bool {
        matches!(self, SweepScope::Local | SweepScope::Both)
    }

    fn includes_remote(self) -> bool {
        matches!(self, SweepScope::Remote | SweepScope::Both)
    }
}

impl FromStr for SweepScope {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(SweepScope::Local),
            "remote" => Ok(SweepScope::Remote),
            "both" | "all" => Ok(SweepScope::Both),
            _ => Err(SyncError::InvalidConfig(format!(
                "Unknown sweep scope: {}. Use local, remote, or both.",
                s
            ))),
        }
    }
}

/// What one sweep removed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// `None` when the local store was out of scope.
    pub local: Option<OrphanCounts>,
    /// `None` when out of scope, skipped, or failed.
    pub remote: Option<OrphanCounts>,
    pub remote_issues: Vec<String>,
}

impl SweepReport {
    pub fn total_removed(&self) -> u64 {
        self.local.map_or(0, |c| c.total()) + self.remote.map_or(0, |c| c.total())
    }
}

pub struct OrphanSweeper {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    oracle: Arc<dyn ConnectivityOracle>,
    op_timeout: Duration,
}

impl OrphanSweeper {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
        op_timeout: Duration,
    ) -> Self {
        OrphanSweeper {
            local,
            remote,
            oracle,
            op_timeout,
        }
    }

    pub async fn sweep(&self, scope: SweepScope) -> SyncResult<SweepReport> {
        let mut report = SweepReport::default();

        if scope.includes_local() {
            let counts = self
                .local
                .delete_orphans()
                .await
                .map_err(|e| SyncError::local("orphan sweep", e))?;
            report.local = Some(counts);
        }

        if scope.includes_remote() {
            let mut leg = RemoteLeg::open(self.remote.clone(), self.oracle.clone(), self.op_timeout);
            if let Some(remote) = leg.active() {
                report.remote = leg.call("orphan sweep", remote.delete_orphans()).await;
            }
            report.remote_issues = leg.into_issues();
        }

        info!(
            ?scope,
            local = ?report.local,
            remote = ?report.remote,
            "Orphan sweep finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityFlag;
    use chrono::Utc;
    use shipdesk_core::{Dimensions, InvoiceNumber, Money, Product, ShipmentBox, Weight};
    use shipdesk_db::{Database, DbConfig};

    async fn db_with_orphans() -> Database {
        let db = Database::new(DbConfig::in_memory().sweep_orphans_on_open(false))
            .await
            .unwrap();
        let now = Utc::now();

        db.boxes()
            .upsert(&ShipmentBox {
                id: "B-LOST".into(),
                invoice_number: InvoiceNumber::parse("GONE-1").unwrap(),
                box_number: "1".into(),
                dimensions: Dimensions::new(1, 1, 1),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        db.products()
            .upsert(&Product {
                id: "P-LOST".into(),
                box_id: "B-LOST".into(),
                product_type: "DOCS".into(),
                description: String::new(),
                weight: Weight::from_grams(10),
                rate: Money::from_cents(10),
                quantity: 1,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("local".parse::<SweepScope>().unwrap(), SweepScope::Local);
        assert_eq!("REMOTE".parse::<SweepScope>().unwrap(), SweepScope::Remote);
        assert_eq!("all".parse::<SweepScope>().unwrap(), SweepScope::Both);
        assert!("everything".parse::<SweepScope>().is_err());
    }

    #[tokio::test]
    async fn test_local_sweep_is_idempotent() {
        let db = db_with_orphans().await;
        let sweeper = OrphanSweeper::new(
            Arc::new(db),
            None,
            Arc::new(ConnectivityFlag::offline()),
            Duration::from_secs(1),
        );

        let first = sweeper.sweep(SweepScope::Local).await.unwrap();
        assert_eq!(
            first.local,
            Some(OrphanCounts {
                boxes: 1,
                products: 1
            })
        );

        let second = sweeper.sweep(SweepScope::Local).await.unwrap();
        assert_eq!(second.local, Some(OrphanCounts::default()));
        assert_eq!(second.total_removed(), 0);
    }

    #[tokio::test]
    async fn test_remote_scope_without_remote_is_not_an_error() {
        let db = db_with_orphans().await;
        let sweeper = OrphanSweeper::new(
            Arc::new(db),
            None,
            Arc::new(ConnectivityFlag::online()),
            Duration::from_secs(1),
        );

        let report = sweeper.sweep(SweepScope::Remote).await.unwrap();
        assert!(report.local.is_none());
        assert!(report.remote.is_none());
    }

    #[tokio::test]
    async fn test_both_scopes_sweep_remote_orphans() {
        use crate::testing::{invoice, MemoryRemote};

        let now = Utc::now();
        let remote = Arc::new(MemoryRemote::new());
        remote.seed(
            &[],
            &[ShipmentBox {
                id: "RB-LOST".into(),
                invoice_number: invoice("GONE-2"),
                box_number: "1".into(),
                dimensions: Dimensions::new(1, 1, 1),
                created_at: now,
                updated_at: now,
            }],
            &[],
        );

        let oracle = Arc::new(ConnectivityFlag::online());
        let sweeper = OrphanSweeper::new(
            Arc::new(db_with_orphans().await),
            Some(remote.clone() as Arc<dyn RemoteStore>),
            oracle.clone(),
            Duration::from_secs(1),
        );

        let report = sweeper.sweep(SweepScope::Both).await.unwrap();
        assert_eq!(report.total_removed(), 3);
        assert!(remote.box_ids().is_empty());

        oracle.set(false);
        let report = sweeper.sweep(SweepScope::Remote).await.unwrap();
        assert!(report.remote.is_none());
        assert_eq!(report.remote_issues.len(), 1);
    }
}
