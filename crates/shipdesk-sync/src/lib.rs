//! # shipdesk-sync: Reconciliation Engine for ShipDesk
//!
//! Keeps a shipment tree (shipment → boxes → products) consistent between
//! the local SQLite store and an optional remote Postgres store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reconciliation Engine                            │
//! │                                                                         │
//! │   caller submits a shipment + ChildSet<BoxInput>                        │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  ReconciliationExecutor                          │  │
//! │  │                                                                  │  │
//! │  │  validate → TreeDiff (boxes, then products per box)              │  │
//! │  │  apply: updates → adds → deletes (children before parents)       │  │
//! │  │  local leg is authoritative, remote leg is best effort           │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  ▼                              ▼                       │
//! │  ┌────────────────────────────┐  ┌────────────────────────────────┐    │
//! │  │ LocalStore (SQLite)        │  │ RemoteStore (Postgres)         │    │
//! │  │ shipdesk_db::Database      │  │ PgRemoteStore                  │    │
//! │  └────────────────────────────┘  └────────────────────────────────┘    │
//! │                                                                         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌─────────────────────────┐     │
//! │  │ OrphanSweeper │  │ ShipmentReader│  │ SyncCoordinator         │     │
//! │  │ parentless    │  │ LocalOnly /   │  │ bulk pull / push with   │     │
//! │  │ boxes+products│  │ PreferRemote  │  │ backoff and progress    │     │
//! │  └───────────────┘  └───────────────┘  └─────────────────────────┘     │
//! │                                                                         │
//! │  ConnectivityOracle gates every remote call.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Engine configuration (device, local path, remote, sync)
//! - [`connectivity`] - Reachability oracle and read modes
//! - [`coordinator`] - Bulk pull/push between stores
//! - [`error`] - Store and engine error types
//! - [`executor`] - Per-shipment reconciliation
//! - [`outcome`] - Pass results
//! - [`reader`] - Tree reads with remote fallback
//! - [`remote`] - Postgres-backed remote store
//! - [`store`] - `LocalStore` / `RemoteStore` seams
//! - [`sweeper`] - Orphan removal
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shipdesk_sync::{ConnectivityFlag, ReconciliationExecutor};
//! use shipdesk_core::ChildSet;
//!
//! let executor = ReconciliationExecutor::new(local, Some(remote), Arc::new(ConnectivityFlag::online()));
//! let result = executor.reconcile(shipment, ChildSet::Replace(boxes)).await?;
//! println!("boxes: {:?}, remote applied: {}", result.boxes, result.remote_applied);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod reader;
pub mod remote;
pub mod store;
pub mod sweeper;

mod leg;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::SyncConfig;
pub use connectivity::{ConnectivityFlag, ConnectivityOracle, ReadMode};
pub use coordinator::{
    Collection, CoordinatorSettings, NoOpProgress, SyncCoordinator, SyncDirection, SyncPhase,
    SyncProgressSink, SyncReport,
};
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use executor::ReconciliationExecutor;
pub use outcome::{ChangeCounts, ReconcileResult};
pub use reader::ShipmentReader;
pub use remote::PgRemoteStore;
pub use store::{LocalStore, RemoteStore, ShipmentStore};
pub use sweeper::{OrphanSweeper, SweepReport, SweepScope};
