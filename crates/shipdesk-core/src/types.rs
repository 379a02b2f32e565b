//! # Domain Types
//!
//! The records Shipdesk persists, identical on the local and remote store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Shipment     │ 1 │   ShipmentBox   │ 1 │    Product      │       │
//! │  │  ─────────────  │──►│  ─────────────  │──►│  ─────────────  │       │
//! │  │  invoice_number │ * │  id (UUID)      │ * │  id (UUID)      │       │
//! │  │  shipper        │   │  invoice_number │   │  box_id         │       │
//! │  │  consignee      │   │  box_number     │   │  weight, rate   │       │
//! │  │  status         │   │  dimensions     │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ ShipmentStatus  │   │  MasterRecord   │  Reference data the editor  │
//! │  │  Pending        │   │  kind + code    │  picks from (shipper names, │
//! │  │  InTransit      │   │  name, details  │  product types, ...)        │
//! │  │  Delivered      │   └─────────────────┘                             │
//! │  │  Cancelled      │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! - Shipments are keyed by their business invoice number, normalized.
//! - Boxes and products carry opaque UUID v4 ids minted on first save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::measure::{Dimensions, Weight};
use crate::money::Money;
use crate::MAX_INVOICE_NUMBER_LEN;

// =============================================================================
// Invoice Number
// =============================================================================

/// A normalized invoice number: trimmed, upper-case, no inner whitespace.
///
/// Every lookup and write goes through this type, so `" inv-1 "` and
/// `"INV-1"` always address the same shipment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Normalizes and validates a raw invoice number.
    ///
    /// ## Example
    /// ```rust
    /// use shipdesk_core::InvoiceNumber;
    ///
    /// let inv = InvoiceNumber::parse("  inv-2024/001 ").unwrap();
    /// assert_eq!(inv.as_str(), "INV-2024/001");
    /// assert!(InvoiceNumber::parse("   ").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(ValidationError::required("invoice_number"));
        }

        if normalized.chars().count() > MAX_INVOICE_NUMBER_LEN {
            return Err(ValidationError::TooLong {
                field: "invoice_number".to_string(),
                max: MAX_INVOICE_NUMBER_LEN,
            });
        }

        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_' | '.')))
        {
            return Err(ValidationError::InvalidFormat {
                field: "invoice_number".to_string(),
                reason: format!("character '{}' is not allowed", bad),
            });
        }

        Ok(InvoiceNumber(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InvoiceNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        InvoiceNumber::parse(&value)
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.0
    }
}

// =============================================================================
// Shipment Status
// =============================================================================

/// Lifecycle status of a shipment.
///
/// Stored as its snake_case name on both stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Booked, still being packed.
    #[default]
    Pending,
    /// Handed to the carrier.
    InTransit,
    /// Signed for at destination.
    Delivered,
    /// Called off before delivery.
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 4] = [
        ShipmentStatus::Pending,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
        ShipmentStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

// =============================================================================
// Shipment
// =============================================================================

/// One side of a shipment (sender or receiver).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Party {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
}

/// The root record of a shipment tree.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shipment {
    /// Business key, normalized.
    #[ts(as = "String")]
    pub invoice_number: InvoiceNumber,

    pub shipper: Party,
    pub consignee: Party,

    /// Origin station or city.
    pub origin: String,

    /// Destination station or city.
    pub destination: String,

    pub carrier: Option<String>,

    /// Air waybill / tracking reference, once assigned.
    pub airway_bill: Option<String>,

    pub status: ShipmentStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// A fresh pending shipment with empty parties.
    pub fn new(invoice_number: InvoiceNumber, now: DateTime<Utc>) -> Self {
        Shipment {
            invoice_number,
            shipper: Party::default(),
            consignee: Party::default(),
            origin: String::new(),
            destination: String::new(),
            carrier: None,
            airway_bill: None,
            status: ShipmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Field equality ignoring timestamps.
    pub fn same_content(&self, other: &Shipment) -> bool {
        self.invoice_number == other.invoice_number
            && self.shipper == other.shipper
            && self.consignee == other.consignee
            && self.origin == other.origin
            && self.destination == other.destination
            && self.carrier == other.carrier
            && self.airway_bill == other.airway_bill
            && self.status == other.status
    }
}

// =============================================================================
// Box
// =============================================================================

/// A physical box inside a shipment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShipmentBox {
    /// Opaque id (UUID v4), immutable once minted.
    pub id: String,

    /// Owning shipment.
    #[ts(as = "String")]
    pub invoice_number: InvoiceNumber,

    /// Label written on the box ("1", "1/4", "A").
    pub box_number: String,

    pub dimensions: Dimensions,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ShipmentBox {
    pub fn volumetric_weight(&self) -> Weight {
        self.dimensions.volumetric_weight()
    }

    /// Field equality ignoring timestamps.
    pub fn same_content(&self, other: &ShipmentBox) -> bool {
        self.id == other.id
            && self.invoice_number == other.invoice_number
            && self.box_number == other.box_number
            && self.dimensions == other.dimensions
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product line packed in a box.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Opaque id (UUID v4), immutable once minted.
    pub id: String,

    /// Owning box.
    pub box_id: String,

    /// Product type code from master data ("DOCS", "GARMENTS", ...).
    pub product_type: String,

    pub description: String,

    /// Weight of one unit.
    pub weight: Weight,

    /// Declared rate per kilogram.
    pub rate: Money,

    pub quantity: u32,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Weight of the whole line (unit weight × quantity).
    pub fn line_weight(&self) -> Weight {
        self.weight * self.quantity
    }

    /// Declared value of the whole line (rate × line weight).
    pub fn declared_value(&self) -> Money {
        self.rate.per_kg(self.line_weight())
    }

    /// Field equality ignoring timestamps.
    pub fn same_content(&self, other: &Product) -> bool {
        self.id == other.id
            && self.box_id == other.box_id
            && self.product_type == other.product_type
            && self.description == other.description
            && self.weight == other.weight
            && self.rate == other.rate
            && self.quantity == other.quantity
    }
}

// =============================================================================
// Master Data
// =============================================================================

/// Which pick-list a master record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MasterKind {
    Shipper,
    Consignee,
    ProductType,
    Destination,
}

impl MasterKind {
    pub const ALL: [MasterKind; 4] = [
        MasterKind::Shipper,
        MasterKind::Consignee,
        MasterKind::ProductType,
        MasterKind::Destination,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            MasterKind::Shipper => "shipper",
            MasterKind::Consignee => "consignee",
            MasterKind::ProductType => "product_type",
            MasterKind::Destination => "destination",
        }
    }
}

impl FromStr for MasterKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MasterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| CoreError::UnknownMasterKind(s.to_string()))
    }
}

/// A pick-list entry. Mirrored between stores by bulk sync only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MasterRecord {
    pub id: String,
    pub kind: MasterKind,
    /// Short code, unique per kind.
    pub code: String,
    pub name: String,
    pub details: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Orphan Counts
// =============================================================================

/// Rows removed by one orphan sweep of one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrphanCounts {
    /// Boxes whose shipment no longer exists.
    pub boxes: u64,
    /// Products whose box no longer exists.
    pub products: u64,
}

impl OrphanCounts {
    pub fn total(&self) -> u64 {
        self.boxes + self.products
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
