//! # Repository Module
//!
//! Database repository implementations for Shipdesk.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  ReconciliationExecutor (via the LocalStore trait)                     │
//! │       │                                                                 │
//! │       │  db.boxes().for_shipment(&invoice)                             │
//! │       ▼                                                                 │
//! │  BoxRepository                                                         │
//! │  ├── for_shipment(&self, invoice)                                      │
//! │  ├── upsert(&self, box)                                                │
//! │  └── delete(&self, id)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ShipmentRepository`](shipment::ShipmentRepository) - Shipment root records
//! - [`BoxRepository`](boxes::BoxRepository) - Boxes of a shipment
//! - [`ProductRepository`](product::ProductRepository) - Product lines of a box
//! - [`MasterDataRepository`](master::MasterDataRepository) - Pick lists
//! - [`MaintenanceRepository`](maintenance::MaintenanceRepository) - Orphan sweep

pub mod boxes;
pub mod maintenance;
pub mod master;
pub mod product;
pub mod shipment;
