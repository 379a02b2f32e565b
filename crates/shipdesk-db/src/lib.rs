//! # shipdesk-db: Local Database Layer for Shipdesk
//!
//! The embedded SQLite store. It is the canonical copy of every shipment
//! on this device and the only backend assumed to be always writable.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shipdesk Data Flow                               │
//! │                                                                         │
//! │  ReconciliationExecutor / SyncCoordinator (shipdesk-sync)              │
//! │       │  via the LocalStore trait                                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shipdesk-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Shipment/Box  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Product       │    │ 001_init.sql │  │   │
//! │  │   │               │    │ MasterData    │    │              │  │   │
//! │  │   │               │    │ Maintenance   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file in the platform data dir (see SyncConfig)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`rows`] - Row types shared with the Postgres remote store
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shipdesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shipdesk.db")).await?;
//! let boxes = db.boxes().for_shipment(&invoice).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod rows;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::boxes::BoxRepository;
pub use repository::maintenance::MaintenanceRepository;
pub use repository::master::MasterDataRepository;
pub use repository::product::ProductRepository;
pub use repository::shipment::ShipmentRepository;
