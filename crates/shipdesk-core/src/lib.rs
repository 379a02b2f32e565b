//! # shipdesk-core: Pure Domain Logic for Shipdesk
//!
//! Record types for shipments, boxes and products, the submission inputs an
//! editor sends, and the tree differ that decides what changed.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shipdesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Editor (external)                            │   │
//! │  │       Shipment form ──► Box list ──► Product rows               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Shipment + ChildSet<BoxInput>          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               shipdesk-sync (ReconciliationExecutor)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shipdesk-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   input   │  │   diff    │  │ validation│  │   │
//! │  │   │ Shipment  │  │ BoxInput  │  │ TreeDiff  │  │   rules   │  │   │
//! │  │   │ Box/Prod. │  │ ChildSet  │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted records (Shipment, ShipmentBox, Product, MasterRecord)
//! - [`input`] - What the editor submits (BoxInput, ProductInput, ChildSet)
//! - [`diff`] - The tree differ (update / add / delete classification)
//! - [`tree`] - Loaded shipment trees and their totals
//! - [`measure`] - Weight and box dimensions in integer units
//! - [`money`] - Money in minor currency units
//! - [`validation`] - Submission validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use shipdesk_core::diff::diff_children;
//! use shipdesk_core::input::ProductInput;
//! use shipdesk_core::measure::Weight;
//! use shipdesk_core::money::Money;
//!
//! let existing = Vec::<shipdesk_core::Product>::new();
//! let submitted = vec![ProductInput::new("DOCS", "Invoices", Weight::from_kg(2.0), Money::from_cents(450), 1)];
//!
//! let diff = diff_children(&existing, submitted);
//! assert_eq!(diff.to_add.len(), 1);
//! assert!(diff.to_update.is_empty());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod diff;
pub mod error;
pub mod input;
pub mod measure;
pub mod money;
pub mod tree;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use diff::{diff_children, Candidate, Keyed, Matched, TreeDiff};
pub use error::{CoreError, CoreResult, ValidationError};
pub use input::{BoxInput, ChildSet, ProductInput};
pub use measure::{Dimensions, Weight};
pub use money::Money;
pub use tree::{BoxTree, ShipmentTotals, ShipmentTree};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum boxes accepted in a single shipment submission.
pub const MAX_BOXES_PER_SHIPMENT: usize = 500;

/// Maximum products accepted in a single box.
pub const MAX_PRODUCTS_PER_BOX: usize = 200;

/// Maximum quantity on a single product row.
///
/// ## Business Reason
/// Catches typing 10000 instead of 100 on the packing list.
pub const MAX_PRODUCT_QUANTITY: u32 = 99_999;

/// Maximum length of an invoice number after normalization.
pub const MAX_INVOICE_NUMBER_LEN: usize = 40;

/// Mints a fresh opaque id for a box or product.
///
/// Ids are UUID v4 so that two offline devices never collide.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
