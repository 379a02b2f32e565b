//! # Sync Coordinator
//!
//! Bulk, one-directional replication between the local and remote stores.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pull_from_remote / push_to_remote                                     │
//! │       │                                                                 │
//! │       ├── guard: remote configured, reachable, signed in               │
//! │       │          (fails fast otherwise)                                 │
//! │       ├── read all four collections from the source                    │
//! │       └── upsert into the target, parents first:                       │
//! │              master data → shipments → boxes → products                │
//! │                                                                         │
//! │  Phase:  Idle ──► Running(0..=100) ──► Completed | Failed(reason)      │
//! │            ▲                                  │                         │
//! │            └──────────── reset / next run ────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write is an upsert keyed by stable id, so a failed run can simply
//! be re-run. Transient remote failures (unreachable, timeout) are retried
//! with exponential backoff inside the configured budget; an unauthorized
//! or rejected call fails the run at once. Local failures are never retried.

use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use shipdesk_core::{MasterRecord, Product, Shipment, ShipmentBox};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityOracle;
use crate::error::{StoreError, StoreResult, SyncError, SyncResult};
use crate::executor::DEFAULT_OP_TIMEOUT;
use crate::store::{LocalStore, RemoteStore};

// =============================================================================
// Phase & Progress
// =============================================================================

/// Where the coordinator is in its state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Percent of records copied.
    Running(u8),
    Completed,
    Failed(String),
}

impl SyncPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, SyncPhase::Running(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Remote → local.
    Pull,
    /// Local → remote.
    Push,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Pull => write!(f, "pull"),
            SyncDirection::Push => write!(f, "push"),
        }
    }
}

/// The four replicated collections, in copy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    MasterData,
    Shipments,
    Boxes,
    Products,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::MasterData => write!(f, "master_data"),
            Collection::Shipments => write!(f, "shipments"),
            Collection::Boxes => write!(f, "boxes"),
            Collection::Products => write!(f, "products"),
        }
    }
}

/// Receives progress while a sync runs.
///
/// Called inline and never awaited; implementations must return quickly.
pub trait SyncProgressSink: Send + Sync {
    fn on_progress(&self, direction: SyncDirection, collection: Collection, percent: u8);
}

/// Progress sink that drops everything.
pub struct NoOpProgress;

impl SyncProgressSink for NoOpProgress {
    fn on_progress(&self, _direction: SyncDirection, _collection: Collection, _percent: u8) {}
}

/// Records copied by one run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub master_records: usize,
    pub shipments: usize,
    pub boxes: usize,
    pub products: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn new(direction: SyncDirection) -> Self {
        let now = Utc::now();
        SyncReport {
            direction,
            master_records: 0,
            shipments: 0,
            boxes: 0,
            products: 0,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn total(&self) -> usize {
        self.master_records + self.shipments + self.boxes + self.products
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Timing knobs for a run.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub op_timeout: Duration,
    pub retry_budget: Duration,
    pub initial_backoff: Duration,
    /// Records between progress reports.
    pub batch_size: usize,
    pub pull_on_login: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            op_timeout: DEFAULT_OP_TIMEOUT,
            retry_budget: Duration::from_secs(60),
            initial_backoff: Duration::from_millis(500),
            batch_size: 100,
            pull_on_login: true,
        }
    }
}

impl From<&SyncConfig> for CoordinatorSettings {
    fn from(config: &SyncConfig) -> Self {
        CoordinatorSettings {
            op_timeout: config.op_timeout(),
            retry_budget: config.retry_budget(),
            initial_backoff: config.initial_backoff(),
            batch_size: config.sync.batch_size.max(1),
            pull_on_login: config.sync.pull_on_login,
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything read from the source store before writing begins.
#[derive(Default)]
struct Snapshot {
    master: Vec<MasterRecord>,
    shipments: Vec<Shipment>,
    boxes: Vec<ShipmentBox>,
    products: Vec<Product>,
}

impl Snapshot {
    fn len(&self) -> usize {
        self.master.len() + self.shipments.len() + self.boxes.len() + self.products.len()
    }
}

/// Turns copied-record counts into phase updates and sink calls.
struct Progress<'a> {
    direction: SyncDirection,
    sink: &'a dyn SyncProgressSink,
    phase: &'a RwLock<SyncPhase>,
    total: usize,
    done: usize,
    batch_size: usize,
}

impl Progress<'_> {
    async fn advance(&mut self, collection: Collection, remaining_in_collection: usize) {
        self.done += 1;
        if self.done % self.batch_size == 0 || remaining_in_collection == 0 {
            self.report(collection).await;
        }
    }

    async fn report(&self, collection: Collection) {
        let percent = if self.total == 0 {
            100
        } else {
            ((self.done * 100) / self.total).min(100) as u8
        };
        *self.phase.write().await = SyncPhase::Running(percent);
        self.sink.on_progress(self.direction, collection, percent);
    }
}

// =============================================================================
// Coordinator
// =============================================================================

pub struct SyncCoordinator {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    oracle: Arc<dyn ConnectivityOracle>,
    settings: CoordinatorSettings,
    phase: Arc<RwLock<SyncPhase>>,
}

impl SyncCoordinator {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
    ) -> Self {
        Self::with_settings(local, remote, oracle, CoordinatorSettings::default())
    }

    pub fn with_settings(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
        settings: CoordinatorSettings,
    ) -> Self {
        SyncCoordinator {
            local,
            remote,
            oracle,
            settings,
            phase: Arc::new(RwLock::new(SyncPhase::Idle)),
        }
    }

    pub fn from_config(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        oracle: Arc<dyn ConnectivityOracle>,
        config: &SyncConfig,
    ) -> Self {
        Self::with_settings(local, remote, oracle, CoordinatorSettings::from(config))
    }

    /// Returns the current phase.
    pub async fn phase(&self) -> SyncPhase {
        self.phase.read().await.clone()
    }

    /// Moves a finished run back to `Idle`. No effect while running.
    pub async fn reset(&self) {
        let mut phase = self.phase.write().await;
        if !phase.is_running() {
            *phase = SyncPhase::Idle;
        }
    }

    /// Copies every remote collection into the local store.
    pub async fn pull_from_remote(
        &self,
        progress: &dyn SyncProgressSink,
    ) -> SyncResult<SyncReport> {
        self.run(SyncDirection::Pull, progress).await
    }

    /// Copies every local collection into the remote store.
    pub async fn push_to_remote(&self, progress: &dyn SyncProgressSink) -> SyncResult<SyncReport> {
        self.run(SyncDirection::Push, progress).await
    }

    /// Runs the configured sign-in pull, if any.
    pub async fn after_sign_in(
        &self,
        progress: &dyn SyncProgressSink,
    ) -> SyncResult<Option<SyncReport>> {
        if !self.settings.pull_on_login {
            debug!("Pull on login disabled");
            return Ok(None);
        }
        self.pull_from_remote(progress).await.map(Some)
    }

    async fn run(
        &self,
        direction: SyncDirection,
        sink: &dyn SyncProgressSink,
    ) -> SyncResult<SyncReport> {
        {
            let mut phase = self.phase.write().await;
            if phase.is_running() {
                return Err(SyncError::AlreadyRunning);
            }
            *phase = SyncPhase::Running(0);
        }

        info!(%direction, "Starting bulk sync");
        let outcome = self.copy(direction, sink).await;

        let mut phase = self.phase.write().await;
        match &outcome {
            Ok(report) => {
                *phase = SyncPhase::Completed;
                info!(
                    %direction,
                    master = report.master_records,
                    shipments = report.shipments,
                    boxes = report.boxes,
                    products = report.products,
                    "Bulk sync completed"
                );
            }
            Err(err) => {
                *phase = SyncPhase::Failed(err.to_string());
                error!(%direction, error = %err, "Bulk sync failed");
            }
        }

        outcome
    }

    /// Fails fast unless the remote can be used right now.
    fn guard(&self) -> SyncResult<Arc<dyn RemoteStore>> {
        let remote = self
            .remote
            .clone()
            .ok_or_else(|| SyncError::RemoteUnreachable("no remote store configured".into()))?;

        if !self.oracle.is_reachable() {
            return Err(SyncError::RemoteUnreachable("remote store is offline".into()));
        }

        remote
            .requires_authenticated_user()
            .map_err(|e| SyncError::remote("session check", e))?;

        Ok(remote)
    }

    async fn copy(
        &self,
        direction: SyncDirection,
        sink: &dyn SyncProgressSink,
    ) -> SyncResult<SyncReport> {
        let remote = self.guard()?;
        let remote = remote.as_ref();
        let mut report = SyncReport::new(direction);

        let snapshot = match direction {
            SyncDirection::Pull => self.read_remote(remote).await?,
            SyncDirection::Push => self.read_local().await?,
        };

        let mut progress = Progress {
            direction,
            sink,
            phase: &self.phase,
            total: snapshot.len(),
            done: 0,
            batch_size: self.settings.batch_size.max(1),
        };
        debug!(%direction, records = progress.total, "Snapshot read");

        match direction {
            SyncDirection::Pull => self.write_local(&snapshot, &mut report, &mut progress).await?,
            SyncDirection::Push => {
                self.write_remote(remote, &snapshot, &mut report, &mut progress)
                    .await?
            }
        }

        if snapshot.len() == 0 {
            progress.report(Collection::Products).await;
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    async fn read_local(&self) -> SyncResult<Snapshot> {
        let local = self.local.as_ref();
        Ok(Snapshot {
            master: local
                .list_master_records()
                .await
                .map_err(|e| SyncError::local("list master data", e))?,
            shipments: local
                .list_shipments()
                .await
                .map_err(|e| SyncError::local("list shipments", e))?,
            boxes: local
                .list_boxes()
                .await
                .map_err(|e| SyncError::local("list boxes", e))?,
            products: local
                .list_products()
                .await
                .map_err(|e| SyncError::local("list products", e))?,
        })
    }

    async fn read_remote(&self, remote: &dyn RemoteStore) -> SyncResult<Snapshot> {
        Ok(Snapshot {
            master: self
                .with_retry("list master data", || remote.list_master_records())
                .await?,
            shipments: self
                .with_retry("list shipments", || remote.list_shipments())
                .await?,
            boxes: self
                .with_retry("list boxes", || remote.list_boxes())
                .await?,
            products: self
                .with_retry("list products", || remote.list_products())
                .await?,
        })
    }

    // =========================================================================
    // Writes (parents before children)
    // =========================================================================

    async fn write_local(
        &self,
        snapshot: &Snapshot,
        report: &mut SyncReport,
        progress: &mut Progress<'_>,
    ) -> SyncResult<()> {
        let local = self.local.as_ref();

        for (i, record) in snapshot.master.iter().enumerate() {
            local
                .upsert_master_record(record)
                .await
                .map_err(|e| SyncError::local(format_args!("upsert master {}", record.id), e))?;
            report.master_records += 1;
            progress
                .advance(Collection::MasterData, snapshot.master.len() - i - 1)
                .await;
        }

        for (i, shipment) in snapshot.shipments.iter().enumerate() {
            local.upsert_shipment(shipment).await.map_err(|e| {
                SyncError::local(format_args!("upsert shipment {}", shipment.invoice_number), e)
            })?;
            report.shipments += 1;
            progress
                .advance(Collection::Shipments, snapshot.shipments.len() - i - 1)
                .await;
        }

        for (i, record) in snapshot.boxes.iter().enumerate() {
            local
                .upsert_box(record)
                .await
                .map_err(|e| SyncError::local(format_args!("upsert box {}", record.id), e))?;
            report.boxes += 1;
            progress
                .advance(Collection::Boxes, snapshot.boxes.len() - i - 1)
                .await;
        }

        for (i, product) in snapshot.products.iter().enumerate() {
            local
                .upsert_product(product)
                .await
                .map_err(|e| SyncError::local(format_args!("upsert product {}", product.id), e))?;
            report.products += 1;
            progress
                .advance(Collection::Products, snapshot.products.len() - i - 1)
                .await;
        }

        Ok(())
    }

    async fn write_remote(
        &self,
        remote: &dyn RemoteStore,
        snapshot: &Snapshot,
        report: &mut SyncReport,
        progress: &mut Progress<'_>,
    ) -> SyncResult<()> {
        for (i, record) in snapshot.master.iter().enumerate() {
            self.with_retry(format!("upsert master {}", record.id), || {
                remote.upsert_master_record(record)
            })
            .await?;
            report.master_records += 1;
            progress
                .advance(Collection::MasterData, snapshot.master.len() - i - 1)
                .await;
        }

        for (i, shipment) in snapshot.shipments.iter().enumerate() {
            self.with_retry(
                format!("upsert shipment {}", shipment.invoice_number),
                || remote.upsert_shipment(shipment),
            )
            .await?;
            report.shipments += 1;
            progress
                .advance(Collection::Shipments, snapshot.shipments.len() - i - 1)
                .await;
        }

        for (i, record) in snapshot.boxes.iter().enumerate() {
            self.with_retry(format!("upsert box {}", record.id), || {
                remote.upsert_box(record)
            })
            .await?;
            report.boxes += 1;
            progress
                .advance(Collection::Boxes, snapshot.boxes.len() - i - 1)
                .await;
        }

        for (i, product) in snapshot.products.iter().enumerate() {
            self.with_retry(format!("upsert product {}", product.id), || {
                remote.upsert_product(product)
            })
            .await?;
            report.products += 1;
            progress
                .advance(Collection::Products, snapshot.products.len() - i - 1)
                .await;
        }

        Ok(())
    }

    // =========================================================================
    // Retry
    // =========================================================================

    /// Runs a remote call under the per-operation timeout, retrying
    /// transient failures until the budget runs out.
    async fn with_retry<T, F, Fut>(&self, operation: impl fmt::Display, mut call: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let policy = ExponentialBackoff {
            initial_interval: self.settings.initial_backoff,
            max_elapsed_time: Some(self.settings.retry_budget),
            ..Default::default()
        };
        let timeout = self.settings.op_timeout;
        let operation = operation.to_string();

        backoff::future::retry(policy, || {
            let fut = call();
            let operation = operation.as_str();
            async move {
                let outcome = match tokio::time::timeout(timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Timeout(timeout)),
                };

                outcome.map_err(|err| {
                    let err = SyncError::remote(operation, err);
                    if err.is_retryable() {
                        warn!(operation, error = %err, "Transient remote failure, retrying");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectivityFlag;
    use crate::executor::ReconciliationExecutor;
    use crate::store::ShipmentStore;
    use crate::testing::{master, memory_db, shipment, two_box_tree, FaultKind, MemoryRemote};
    use shipdesk_core::MasterKind;
    use shipdesk_db::{Database, DbConfig};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<u8>>);

    impl SyncProgressSink for Collect {
        fn on_progress(&self, _direction: SyncDirection, _collection: Collection, percent: u8) {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(percent);
            }
        }
    }

    async fn coordinator(online: bool) -> SyncCoordinator {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        SyncCoordinator::new(Arc::new(db), None, Arc::new(ConnectivityFlag::new(online)))
    }

    #[tokio::test]
    async fn test_fails_fast_without_remote() {
        let coordinator = coordinator(true).await;
        let err = coordinator.push_to_remote(&NoOpProgress).await.unwrap_err();

        assert!(matches!(err, SyncError::RemoteUnreachable(_)));
        assert!(matches!(coordinator.phase().await, SyncPhase::Failed(_)));

        coordinator.reset().await;
        assert_eq!(coordinator.phase().await, SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_pull_on_login_can_be_disabled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = CoordinatorSettings {
            pull_on_login: false,
            ..Default::default()
        };
        let coordinator = SyncCoordinator::with_settings(
            Arc::new(db),
            None,
            Arc::new(ConnectivityFlag::offline()),
            settings,
        );

        assert!(coordinator.after_sign_in(&NoOpProgress).await.unwrap().is_none());
        assert_eq!(coordinator.phase().await, SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_progress_reports_percentages() {
        let phase = RwLock::new(SyncPhase::Idle);
        let sink = Collect::default();
        let mut progress = Progress {
            direction: SyncDirection::Pull,
            sink: &sink,
            phase: &phase,
            total: 4,
            done: 0,
            batch_size: 2,
        };

        progress.advance(Collection::Shipments, 3).await;
        progress.advance(Collection::Shipments, 2).await;
        progress.advance(Collection::Boxes, 0).await;
        progress.advance(Collection::Products, 0).await;

        assert_eq!(*sink.0.lock().unwrap(), vec![50, 75, 100]);
        assert_eq!(*phase.read().await, SyncPhase::Running(100));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = SyncConfig::default();
        config.remote.op_timeout_secs = 9;
        config.sync.batch_size = 0;
        let settings = CoordinatorSettings::from(&config);
        assert_eq!(settings.op_timeout, Duration::from_secs(9));
        assert_eq!(settings.batch_size, 1);
    }

    // =========================================================================
    // Against an in-memory remote
    // =========================================================================

    fn quick() -> CoordinatorSettings {
        CoordinatorSettings {
            op_timeout: Duration::from_millis(100),
            retry_budget: Duration::from_secs(2),
            initial_backoff: Duration::from_millis(10),
            batch_size: 2,
            pull_on_login: true,
        }
    }

    async fn mirrored(
        remote: MemoryRemote,
        online: bool,
    ) -> (Database, Arc<MemoryRemote>, SyncCoordinator) {
        let db = memory_db().await;
        let remote = Arc::new(remote);
        let coordinator = SyncCoordinator::with_settings(
            Arc::new(db.clone()),
            Some(remote.clone() as Arc<dyn RemoteStore>),
            Arc::new(ConnectivityFlag::new(online)),
            quick(),
        );
        (db, remote, coordinator)
    }

    /// Fills the local store with one two-box shipment and two master rows.
    async fn populate(db: &Database) {
        let executor = ReconciliationExecutor::new(
            Arc::new(db.clone()),
            None,
            Arc::new(ConnectivityFlag::offline()),
        );
        executor
            .reconcile(shipment("SYNC-1"), two_box_tree())
            .await
            .unwrap();
        db.upsert_master_record(&master("M1", MasterKind::Shipper, "NW"))
            .await
            .unwrap();
        db.upsert_master_record(&master("M2", MasterKind::Destination, "LHR"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_copies_parents_first() {
        let (db, remote, coordinator) = mirrored(MemoryRemote::new(), true).await;
        populate(&db).await;

        let sink = Collect::default();
        let report = coordinator.push_to_remote(&sink).await.unwrap();

        assert_eq!(report.direction, SyncDirection::Push);
        assert_eq!(report.master_records, 2);
        assert_eq!(report.shipments, 1);
        assert_eq!(report.boxes, 2);
        assert_eq!(report.products, 3);
        assert_eq!(coordinator.phase().await, SyncPhase::Completed);
        assert_eq!(sink.0.lock().unwrap().last(), Some(&100));

        let writes: Vec<String> = remote
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("upsert_"))
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect();
        let rank = |op: &str| match op {
            "upsert_master_record" => 0,
            "upsert_shipment" => 1,
            "upsert_box" => 2,
            _ => 3,
        };
        assert!(writes.windows(2).all(|w| rank(&w[0]) <= rank(&w[1])));
        assert_eq!(writes.len(), 8);
    }

    #[tokio::test]
    async fn test_pull_fills_local_store() {
        let (source, remote, _) = mirrored(MemoryRemote::new(), true).await;
        populate(&source).await;
        let pusher = SyncCoordinator::with_settings(
            Arc::new(source),
            Some(remote.clone() as Arc<dyn RemoteStore>),
            Arc::new(ConnectivityFlag::online()),
            quick(),
        );
        pusher.push_to_remote(&NoOpProgress).await.unwrap();
        assert_eq!(remote.master_count(), 2);

        let target = memory_db().await;
        let puller = SyncCoordinator::with_settings(
            Arc::new(target.clone()),
            Some(remote as Arc<dyn RemoteStore>),
            Arc::new(ConnectivityFlag::online()),
            quick(),
        );
        let report = puller.after_sign_in(&NoOpProgress).await.unwrap().unwrap();

        assert_eq!(report.direction, SyncDirection::Pull);
        assert_eq!(report.total(), 8);
        assert_eq!(target.shipments().count().await.unwrap(), 1);
        assert_eq!(target.products().count().await.unwrap(), 3);
        assert_eq!(target.list_master_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (db, remote, coordinator) = mirrored(MemoryRemote::new(), true).await;
        populate(&db).await;
        remote.inject("upsert_box", FaultKind::Unreachable, 1);
        remote.inject("upsert_product", FaultKind::Hang, 1);

        let report = coordinator.push_to_remote(&NoOpProgress).await.unwrap();
        assert_eq!(report.boxes, 2);
        assert_eq!(report.products, 3);

        let calls = remote.calls();
        let box_writes = calls.iter().filter(|c| c.starts_with("upsert_box")).count();
        let product_writes = calls
            .iter()
            .filter(|c| c.starts_with("upsert_product"))
            .count();
        assert_eq!(box_writes, 3);
        assert_eq!(product_writes, 4);
    }

    #[tokio::test]
    async fn test_backend_error_fails_without_retry() {
        let (db, remote, coordinator) = mirrored(MemoryRemote::new(), true).await;
        populate(&db).await;
        remote.inject("upsert_shipment", FaultKind::Backend, 1);

        let err = coordinator.push_to_remote(&NoOpProgress).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteFailed(_)));
        assert!(matches!(coordinator.phase().await, SyncPhase::Failed(_)));

        let attempts = remote
            .calls()
            .iter()
            .filter(|c| c.starts_with("upsert_shipment"))
            .count();
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_guard_rejects_offline_and_signed_out() {
        let (_, remote, coordinator) = mirrored(MemoryRemote::new(), false).await;
        let err = coordinator.pull_from_remote(&NoOpProgress).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnreachable(_)));
        assert!(remote.calls().is_empty());

        let (_, remote, coordinator) = mirrored(MemoryRemote::signed_out(), true).await;
        let err = coordinator.pull_from_remote(&NoOpProgress).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnauthorized));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_while_running() {
        let (_, remote, coordinator) = mirrored(MemoryRemote::new(), true).await;
        remote.inject("list_master_records", FaultKind::Hang, 1);

        let (first, second) = tokio::join!(coordinator.pull_from_remote(&NoOpProgress), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            coordinator.push_to_remote(&NoOpProgress).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(SyncError::AlreadyRunning)));
        assert_eq!(coordinator.phase().await, SyncPhase::Completed);
    }
}
