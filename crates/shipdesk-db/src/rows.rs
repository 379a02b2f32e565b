//! # Row Types
//!
//! Flat column-for-column mirrors of the tables, decoded with `FromRow`.
//!
//! The derives are generic over the row type, so the Postgres remote store
//! in shipdesk-sync decodes into these same structs. Both schemas keep the
//! column names and use 64-bit integers for that reason.

use chrono::{DateTime, Utc};
use shipdesk_core::{
    CoreError, CoreResult, Dimensions, InvoiceNumber, MasterRecord, Money, Party, Product,
    Shipment, ShipmentBox, Weight,
};

/// Column list for `SELECT`s on `shipments`, in [`ShipmentRow`] order.
pub const SHIPMENT_COLUMNS: &str = "invoice_number, shipper_name, shipper_address, shipper_phone, \
     consignee_name, consignee_address, consignee_phone, origin, destination, carrier, \
     airway_bill, status, created_at, updated_at";

pub const BOX_COLUMNS: &str =
    "id, invoice_number, box_number, length_cm, width_cm, height_cm, created_at, updated_at";

pub const PRODUCT_COLUMNS: &str = "id, box_id, product_type, description, weight_grams, \
     rate_cents, quantity, created_at, updated_at";

pub const MASTER_COLUMNS: &str = "id, kind, code, name, details, updated_at";

// =============================================================================
// Shipments
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipmentRow {
    pub invoice_number: String,
    pub shipper_name: String,
    pub shipper_address: String,
    pub shipper_phone: Option<String>,
    pub consignee_name: String,
    pub consignee_address: String,
    pub consignee_phone: Option<String>,
    pub origin: String,
    pub destination: String,
    pub carrier: Option<String>,
    pub airway_bill: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = CoreError;

    fn try_from(row: ShipmentRow) -> CoreResult<Self> {
        Ok(Shipment {
            invoice_number: InvoiceNumber::parse(&row.invoice_number)?,
            shipper: Party {
                name: row.shipper_name,
                address: row.shipper_address,
                phone: row.shipper_phone,
            },
            consignee: Party {
                name: row.consignee_name,
                address: row.consignee_address,
                phone: row.consignee_phone,
            },
            origin: row.origin,
            destination: row.destination,
            carrier: row.carrier,
            airway_bill: row.airway_bill,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Boxes
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BoxRow {
    pub id: String,
    pub invoice_number: String,
    pub box_number: String,
    pub length_cm: i64,
    pub width_cm: i64,
    pub height_cm: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BoxRow> for ShipmentBox {
    type Error = CoreError;

    fn try_from(row: BoxRow) -> CoreResult<Self> {
        let dimensions = Dimensions::new(
            centimetres(&row.id, "length_cm", row.length_cm)?,
            centimetres(&row.id, "width_cm", row.width_cm)?,
            centimetres(&row.id, "height_cm", row.height_cm)?,
        );

        Ok(ShipmentBox {
            invoice_number: InvoiceNumber::parse(&row.invoice_number)?,
            id: row.id,
            box_number: row.box_number,
            dimensions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn centimetres(id: &str, field: &str, value: i64) -> CoreResult<u32> {
    u32::try_from(value).map_err(|_| CoreError::CorruptMeasure {
        entity: "box".to_string(),
        id: id.to_string(),
        field: field.to_string(),
        value,
    })
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: String,
    pub box_id: String,
    pub product_type: String,
    pub description: String,
    pub weight_grams: i64,
    pub rate_cents: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = CoreError;

    fn try_from(row: ProductRow) -> CoreResult<Self> {
        let quantity = u32::try_from(row.quantity).map_err(|_| CoreError::CorruptMeasure {
            entity: "product".to_string(),
            id: row.id.clone(),
            field: "quantity".to_string(),
            value: row.quantity,
        })?;

        Ok(Product {
            id: row.id,
            box_id: row.box_id,
            product_type: row.product_type,
            description: row.description,
            weight: Weight::from_grams(row.weight_grams),
            rate: Money::from_cents(row.rate_cents),
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Master Data
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MasterRow {
    pub id: String,
    pub kind: String,
    pub code: String,
    pub name: String,
    pub details: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MasterRow> for MasterRecord {
    type Error = CoreError;

    fn try_from(row: MasterRow) -> CoreResult<Self> {
        Ok(MasterRecord {
            id: row.id,
            kind: row.kind.parse()?,
            code: row.code,
            name: row.name,
            details: row.details,
            updated_at: row.updated_at,
        })
    }
}

/// Converts a batch of rows, failing on the first bad one.
pub fn convert_all<R, T>(rows: Vec<R>) -> CoreResult<Vec<T>>
where
    T: TryFrom<R, Error = CoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
