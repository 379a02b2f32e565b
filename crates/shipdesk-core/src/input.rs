//! # Submission Inputs
//!
//! What the editor hands to the reconciliation executor. Children carry an
//! optional id: present means "this is a record you already know", absent
//! means "new, mint an id".
//!
//! ## Untouched vs. Replace
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products: Untouched            products: Replace([])                   │
//! │  ───────────────────            ─────────────────────                   │
//! │  "I didn't load / edit the      "The box is empty now."                 │
//! │   product list."                                                        │
//! │                                                                         │
//! │  → persisted products stay      → every persisted product is deleted   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A box carrying no product list therefore never has its contents wiped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::measure::{Dimensions, Weight};
use crate::money::Money;
use crate::types::{InvoiceNumber, Product, ShipmentBox};

// =============================================================================
// ChildSet
// =============================================================================

/// A child collection in a submission, or the explicit absence of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", content = "items", rename_all = "snake_case")]
pub enum ChildSet<T> {
    /// The submitter did not touch this collection; leave it as persisted.
    Untouched,
    /// The submitted list is the complete desired collection.
    Replace(Vec<T>),
}

impl<T> ChildSet<T> {
    pub fn replace(items: impl IntoIterator<Item = T>) -> Self {
        ChildSet::Replace(items.into_iter().collect())
    }

    pub fn is_untouched(&self) -> bool {
        matches!(self, ChildSet::Untouched)
    }

    /// The submitted items, or `None` for [`ChildSet::Untouched`].
    pub fn items(&self) -> Option<&[T]> {
        match self {
            ChildSet::Untouched => None,
            ChildSet::Replace(items) => Some(items),
        }
    }

    pub fn into_items(self) -> Option<Vec<T>> {
        match self {
            ChildSet::Untouched => None,
            ChildSet::Replace(items) => Some(items),
        }
    }
}

impl<T> Default for ChildSet<T> {
    fn default() -> Self {
        ChildSet::Untouched
    }
}

/// Trims a submitted id; blank ids count as absent.
pub(crate) fn normalized_id(id: &Option<String>) -> Option<&str> {
    id.as_deref().map(str::trim).filter(|id| !id.is_empty())
}

// =============================================================================
// Box Input
// =============================================================================

/// A box as submitted by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoxInput {
    /// Id of a persisted box, or `None` for a new one.
    #[serde(default)]
    pub id: Option<String>,

    pub box_number: String,

    #[serde(default)]
    pub dimensions: Dimensions,

    #[serde(default)]
    pub products: ChildSet<ProductInput>,
}

impl BoxInput {
    pub fn new(box_number: impl Into<String>, dimensions: Dimensions) -> Self {
        BoxInput {
            id: None,
            box_number: box_number.into(),
            dimensions,
            products: ChildSet::Untouched,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_products(mut self, products: impl IntoIterator<Item = ProductInput>) -> Self {
        self.products = ChildSet::replace(products);
        self
    }

    /// The submitted id, trimmed, if any.
    pub fn submitted_id(&self) -> Option<&str> {
        normalized_id(&self.id)
    }

    /// True when the box's own fields differ from `existing`.
    pub fn metadata_differs_from(&self, existing: &ShipmentBox) -> bool {
        self.box_number.trim() != existing.box_number || self.dimensions != existing.dimensions
    }

    /// Builds the persisted record.
    ///
    /// `id` is the submitted id for matched or unknown ids, or a freshly
    /// minted one. `created_at` is preserved from the existing record when
    /// there is one.
    pub fn to_record(
        &self,
        id: String,
        invoice_number: &InvoiceNumber,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ShipmentBox {
        ShipmentBox {
            id,
            invoice_number: invoice_number.clone(),
            box_number: self.box_number.trim().to_string(),
            dimensions: self.dimensions,
            created_at,
            updated_at: now,
        }
    }
}

// =============================================================================
// Product Input
// =============================================================================

/// A product line as submitted by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    #[serde(default)]
    pub id: Option<String>,
    pub product_type: String,
    #[serde(default)]
    pub description: String,
    pub weight: Weight,
    pub rate: Money,
    pub quantity: u32,
}

impl ProductInput {
    pub fn new(
        product_type: impl Into<String>,
        description: impl Into<String>,
        weight: Weight,
        rate: Money,
        quantity: u32,
    ) -> Self {
        ProductInput {
            id: None,
            product_type: product_type.into(),
            description: description.into(),
            weight,
            rate,
            quantity,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn submitted_id(&self) -> Option<&str> {
        normalized_id(&self.id)
    }

    /// True when any content field differs from `existing`.
    pub fn differs_from(&self, existing: &Product) -> bool {
        self.product_type.trim() != existing.product_type
            || self.description.trim() != existing.description
            || self.weight != existing.weight
            || self.rate != existing.rate
            || self.quantity != existing.quantity
    }

    pub fn to_record(
        &self,
        id: String,
        box_id: &str,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Product {
        Product {
            id,
            box_id: box_id.to_string(),
            product_type: self.product_type.trim().to_string(),
            description: self.description.trim().to_string(),
            weight: self.weight,
            rate: self.rate,
            quantity: self.quantity,
            created_at,
            updated_at: now,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
