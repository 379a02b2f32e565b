//! # Shipment Trees
//!
//! A shipment loaded together with its boxes and their products, plus the
//! totals printed on the manifest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::measure::Weight;
use crate::money::Money;
use crate::types::{Product, Shipment, ShipmentBox};

/// A persisted box with its products.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BoxTree {
    pub record: ShipmentBox,
    pub products: Vec<Product>,
}

impl BoxTree {
    /// Sum of the product line weights.
    pub fn actual_weight(&self) -> Weight {
        self.products.iter().map(Product::line_weight).sum()
    }

    /// The greater of actual and volumetric weight.
    pub fn chargeable_weight(&self) -> Weight {
        self.actual_weight().max(self.record.volumetric_weight())
    }
}

/// A persisted shipment with its boxes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShipmentTree {
    pub shipment: Shipment,
    pub boxes: Vec<BoxTree>,
}

impl ShipmentTree {
    /// Groups flat box and product lists into a tree.
    ///
    /// Products whose box isn't among `boxes` are orphans and are left out.
    /// Box order is preserved; products keep their relative order.
    pub fn assemble(shipment: Shipment, boxes: Vec<ShipmentBox>, products: Vec<Product>) -> Self {
        let mut by_box: HashMap<String, Vec<Product>> = HashMap::new();
        for product in products {
            by_box.entry(product.box_id.clone()).or_default().push(product);
        }

        let boxes = boxes
            .into_iter()
            .map(|record| {
                let products = by_box.remove(&record.id).unwrap_or_default();
                BoxTree { record, products }
            })
            .collect();

        ShipmentTree { shipment, boxes }
    }

    pub fn totals(&self) -> ShipmentTotals {
        let mut totals = ShipmentTotals::default();
        for tree in &self.boxes {
            totals.box_count += 1;
            totals.actual_weight += tree.actual_weight();
            totals.volumetric_weight += tree.record.volumetric_weight();
            totals.chargeable_weight += tree.chargeable_weight();
            for product in &tree.products {
                totals.product_count += 1;
                totals.piece_count += product.quantity as u64;
                totals.declared_value += product.declared_value();
            }
        }
        totals
    }
}

/// Manifest totals for one shipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShipmentTotals {
    pub box_count: u32,
    pub product_count: u32,
    pub piece_count: u64,
    pub actual_weight: Weight,
    pub volumetric_weight: Weight,
    /// Per-box max(actual, volumetric), summed.
    pub chargeable_weight: Weight,
    pub declared_value: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::Dimensions;
    use crate::types::InvoiceNumber;
    use chrono::Utc;

    fn shipment() -> Shipment {
        Shipment::new(InvoiceNumber::parse("INV-1").unwrap(), Utc::now())
    }

    fn ship_box(id: &str, dims: Dimensions) -> ShipmentBox {
        let now = Utc::now();
        ShipmentBox {
            id: id.to_string(),
            invoice_number: InvoiceNumber::parse("INV-1").unwrap(),
            box_number: id.to_string(),
            dimensions: dims,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(id: &str, box_id: &str, grams: i64, rate: i64, qty: u32) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            box_id: box_id.to_string(),
            product_type: "GEN".to_string(),
            description: String::new(),
            weight: Weight::from_grams(grams),
            rate: Money::from_cents(rate),
            quantity: qty,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_assemble_groups_and_drops_orphans() {
        let tree = ShipmentTree::assemble(
            shipment(),
            vec![ship_box("B1", Dimensions::default()), ship_box("B2", Dimensions::default())],
            vec![
                product("P1", "B1", 100, 0, 1),
                product("P2", "B2", 100, 0, 1),
                product("P3", "B1", 100, 0, 1),
                product("PX", "GONE", 100, 0, 1),
            ],
        );

        assert_eq!(tree.boxes.len(), 2);
        let ids: Vec<&str> = tree.boxes[0].products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3"]);
        assert_eq!(tree.boxes[1].products.len(), 1);
    }

    #[test]
    fn test_totals_use_chargeable_weight_per_box() {
        // B1: actual 2 kg, volumetric 12 kg (50x40x30)
        // B2: actual 5 kg, volumetric 0.2 kg (10x10x10)
        let tree = ShipmentTree::assemble(
            shipment(),
            vec![
                ship_box("B1", Dimensions::new(50, 40, 30)),
                ship_box("B2", Dimensions::new(10, 10, 10)),
            ],
            vec![
                product("P1", "B1", 1_000, 500, 2),
                product("P2", "B2", 5_000, 200, 1),
            ],
        );

        let totals = tree.totals();
        assert_eq!(totals.box_count, 2);
        assert_eq!(totals.product_count, 2);
        assert_eq!(totals.piece_count, 3);
        assert_eq!(totals.actual_weight.grams(), 7_000);
        assert_eq!(totals.chargeable_weight.grams(), 17_000);
        // 5.00 × 2 kg + 2.00 × 5 kg
        assert_eq!(totals.declared_value.cents(), 2_000);
    }
}
