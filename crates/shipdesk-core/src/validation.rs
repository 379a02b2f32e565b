//! # Validation Module
//!
//! Submission checks run before the reconciliation executor writes anything.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Editor                                                        │
//! │  └── Field-level checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Invoice number format (InvoiceNumber::parse)                      │
//! │  ├── Box labels, measures, quantities                                  │
//! │  └── Duplicate child ids within one submission                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Stores                                                        │
//! │  └── Primary keys, NOT NULL, CHECK (quantity >= 0)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Duplicate ids matter because the differ matches each persisted id at
//! most once; a repeated id would otherwise turn into an add that
//! overwrites its twin.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::input::{BoxInput, ChildSet, ProductInput};
use crate::types::Shipment;
use crate::{MAX_BOXES_PER_SHIPMENT, MAX_PRODUCTS_PER_BOX, MAX_PRODUCT_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_LABEL_LEN: usize = 40;
const MAX_TEXT_LEN: usize = 200;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a box label.
///
/// ## Example
/// ```rust
/// use shipdesk_core::validation::validate_box_number;
///
/// assert!(validate_box_number("Box 1").is_ok());
/// assert!(validate_box_number("  ").is_err());
/// ```
pub fn validate_box_number(label: &str) -> ValidationResult<()> {
    let label = label.trim();

    if label.is_empty() {
        return Err(ValidationError::required("box_number"));
    }

    if label.chars().count() > MAX_LABEL_LEN {
        return Err(ValidationError::TooLong {
            field: "box_number".to_string(),
            max: MAX_LABEL_LEN,
        });
    }

    Ok(())
}

fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

/// Validates a product line.
///
/// ## Rules
/// - `product_type` is required
/// - weight and rate must not be negative
/// - quantity between 1 and [`MAX_PRODUCT_QUANTITY`]
pub fn validate_product(product: &ProductInput) -> ValidationResult<()> {
    if product.product_type.trim().is_empty() {
        return Err(ValidationError::required("product_type"));
    }
    validate_text("product_type", &product.product_type)?;
    validate_text("description", &product.description)?;

    if product.weight.is_negative() {
        return Err(ValidationError::Negative {
            field: "weight".to_string(),
        });
    }

    if product.rate.is_negative() {
        return Err(ValidationError::Negative {
            field: "rate".to_string(),
        });
    }

    if product.quantity == 0 || product.quantity > MAX_PRODUCT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_PRODUCT_QUANTITY as i64,
        });
    }

    Ok(())
}

/// Validates a box and, when present, its product list.
pub fn validate_box(input: &BoxInput) -> ValidationResult<()> {
    validate_box_number(&input.box_number)?;

    if let Some(products) = input.products.items() {
        if products.len() > MAX_PRODUCTS_PER_BOX {
            return Err(ValidationError::TooMany {
                field: "products".to_string(),
                max: MAX_PRODUCTS_PER_BOX,
            });
        }
        for product in products {
            validate_product(product)?;
        }
    }

    Ok(())
}

/// Validates the descriptive shipment fields.
pub fn validate_shipment(shipment: &Shipment) -> ValidationResult<()> {
    validate_text("shipper.name", &shipment.shipper.name)?;
    validate_text("shipper.address", &shipment.shipper.address)?;
    validate_text("consignee.name", &shipment.consignee.name)?;
    validate_text("consignee.address", &shipment.consignee.address)?;
    validate_text("origin", &shipment.origin)?;
    validate_text("destination", &shipment.destination)?;

    if let Some(awb) = &shipment.airway_bill {
        if awb.trim().contains(char::is_whitespace) {
            return Err(ValidationError::InvalidFormat {
                field: "airway_bill".to_string(),
                reason: "must not contain spaces".to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Submission Validator
// =============================================================================

/// Validates a whole box submission.
///
/// Box ids must be unique across the submission, and so must product ids:
/// a product id repeated in two boxes would be written twice under one key.
///
/// ## Example
/// ```rust
/// use shipdesk_core::input::{BoxInput, ChildSet};
/// use shipdesk_core::measure::Dimensions;
/// use shipdesk_core::validation::validate_boxes;
///
/// let boxes = ChildSet::replace(vec![
///     BoxInput::new("1", Dimensions::default()).with_id("B1"),
///     BoxInput::new("2", Dimensions::default()).with_id("B1"),
/// ]);
/// assert!(validate_boxes(&boxes).is_err());
/// ```
pub fn validate_boxes(boxes: &ChildSet<BoxInput>) -> ValidationResult<()> {
    let Some(boxes) = boxes.items() else {
        return Ok(());
    };

    if boxes.len() > MAX_BOXES_PER_SHIPMENT {
        return Err(ValidationError::TooMany {
            field: "boxes".to_string(),
            max: MAX_BOXES_PER_SHIPMENT,
        });
    }

    let mut box_ids = HashSet::new();
    let mut product_ids = HashSet::new();

    for input in boxes {
        validate_box(input)?;

        if let Some(id) = input.submitted_id() {
            if !box_ids.insert(id) {
                return Err(ValidationError::duplicate("box id", id));
            }
        }

        for product in input.products.items().unwrap_or_default() {
            if let Some(id) = product.submitted_id() {
                if !product_ids.insert(id) {
                    return Err(ValidationError::duplicate("product id", id));
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Dimensions, Weight};
    use crate::money::Money;

    fn product() -> ProductInput {
        ProductInput::new("DOCS", "Papers", Weight::from_grams(100), Money::from_cents(50), 1)
    }

    #[test]
    fn test_box_number_rules() {
        assert!(validate_box_number("1/4").is_ok());
        assert!(validate_box_number("").is_err());
        assert!(validate_box_number(&"9".repeat(41)).is_err());
    }

    #[test]
    fn test_product_rules() {
        assert!(validate_product(&product()).is_ok());

        let mut p = product();
        p.quantity = 0;
        assert!(matches!(
            validate_product(&p),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut p = product();
        p.weight = Weight::from_grams(-1);
        assert!(matches!(
            validate_product(&p),
            Err(ValidationError::Negative { .. })
        ));

        let mut p = product();
        p.product_type = " ".to_string();
        assert!(matches!(
            validate_product(&p),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_untouched_submission_is_valid() {
        assert!(validate_boxes(&ChildSet::Untouched).is_ok());
    }

    #[test]
    fn test_duplicate_product_ids_across_boxes() {
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::default()).with_products(vec![product().with_id("P1")]),
            BoxInput::new("2", Dimensions::default()).with_products(vec![product().with_id("P1")]),
        ]);
        assert!(matches!(
            validate_boxes(&boxes),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_new_children_without_ids_never_collide() {
        let boxes = ChildSet::replace(vec![
            BoxInput::new("1", Dimensions::default()).with_products(vec![product(), product()]),
            BoxInput::new("2", Dimensions::default()),
        ]);
        assert!(validate_boxes(&boxes).is_ok());
    }

    #[test]
    fn test_too_many_products() {
        let input = BoxInput::new("1", Dimensions::default())
            .with_products(std::iter::repeat_with(product).take(MAX_PRODUCTS_PER_BOX + 1));
        assert!(matches!(
            validate_box(&input),
            Err(ValidationError::TooMany { .. })
        ));
    }
}
