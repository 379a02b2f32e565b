//! # Tree Differ
//!
//! Classifies a submitted child collection against the persisted one.
//!
//! ## Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  existing: {B1, B2, B3}          submitted: {B1', B3, <new>, B9}        │
//! │                                                                         │
//! │  B1  in both, fields differ ──────────────► to_update (B1, B1')         │
//! │  B3  in both, identical ──────────────────► unchanged                   │
//! │  <new> no id ─────────────────────────────► to_add                      │
//! │  B9  id unknown to existing ──────────────► to_add (keeps its id)       │
//! │  B2  not submitted ───────────────────────► to_delete                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The four buckets are disjoint and together cover every existing and
//! every submitted record. Submitted keys are assumed unique; run
//! [`crate::validation::validate_boxes`] first.
//!
//! The differ is pure and generic: the same function drives the box level
//! (existing [`BoxTree`]s vs. [`BoxInput`]s) and the product level
//! (existing [`Product`]s vs. [`ProductInput`]s).

use std::collections::HashSet;

use crate::input::{BoxInput, ChildSet, ProductInput};
use crate::tree::BoxTree;
use crate::types::{Product, ShipmentBox};

// =============================================================================
// Traits
// =============================================================================

/// A persisted record with a stable key.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// A submitted record that may be matched against a persisted `E`.
pub trait Candidate<E> {
    /// The id the submitter claims, if any.
    fn candidate_key(&self) -> Option<&str>;

    /// True when applying `self` over `existing` would change anything.
    fn differs_from(&self, existing: &E) -> bool;
}

impl<E, T: Candidate<E> + ?Sized> Candidate<E> for &T {
    fn candidate_key(&self) -> Option<&str> {
        (**self).candidate_key()
    }

    fn differs_from(&self, existing: &E) -> bool {
        (**self).differs_from(existing)
    }
}

// =============================================================================
// TreeDiff
// =============================================================================

/// An existing record paired with the submitted data that replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Matched<E, I> {
    pub existing: E,
    pub submitted: I,
}

/// The outcome of [`diff_children`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDiff<E, I> {
    /// Matched by id and changed.
    pub to_update: Vec<Matched<E, I>>,
    /// No id, or an id the existing set doesn't know.
    pub to_add: Vec<I>,
    /// Persisted but no longer submitted.
    pub to_delete: Vec<E>,
    /// Keys matched by id with nothing to write.
    pub unchanged: Vec<String>,
}

impl<E, I> TreeDiff<E, I> {
    /// True when applying the diff would write nothing.
    pub fn is_noop(&self) -> bool {
        self.to_update.is_empty() && self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

impl<E, I> Default for TreeDiff<E, I> {
    fn default() -> Self {
        TreeDiff {
            to_update: Vec::new(),
            to_add: Vec::new(),
            to_delete: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

/// Diffs `submitted` against `existing`.
///
/// Output order follows input order: updates, adds and unchanged in
/// submission order, deletes in persisted order.
pub fn diff_children<E, I>(existing: &[E], submitted: impl IntoIterator<Item = I>) -> TreeDiff<E, I>
where
    E: Keyed + Clone,
    I: Candidate<E>,
{
    let mut diff = TreeDiff::default();
    let mut claimed: HashSet<String> = HashSet::new();

    for candidate in submitted {
        let matched = candidate.candidate_key().and_then(|key| {
            if claimed.contains(key) {
                return None;
            }
            existing.iter().find(|e| e.key() == key)
        });

        match matched {
            Some(current) => {
                claimed.insert(current.key().to_string());
                if candidate.differs_from(current) {
                    diff.to_update.push(Matched {
                        existing: current.clone(),
                        submitted: candidate,
                    });
                } else {
                    diff.unchanged.push(current.key().to_string());
                }
            }
            None => diff.to_add.push(candidate),
        }
    }

    diff.to_delete = existing
        .iter()
        .filter(|e| !claimed.contains(e.key()))
        .cloned()
        .collect();

    diff
}

// =============================================================================
// Record Bindings
// =============================================================================

impl Keyed for Product {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ShipmentBox {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for BoxTree {
    fn key(&self) -> &str {
        &self.record.id
    }
}

impl Candidate<Product> for ProductInput {
    fn candidate_key(&self) -> Option<&str> {
        self.submitted_id()
    }

    fn differs_from(&self, existing: &Product) -> bool {
        ProductInput::differs_from(self, existing)
    }
}

/// A box differs when its own fields changed, or when it carries a product
/// list that differs from the persisted products.
impl Candidate<BoxTree> for BoxInput {
    fn candidate_key(&self) -> Option<&str> {
        self.submitted_id()
    }

    fn differs_from(&self, existing: &BoxTree) -> bool {
        if self.metadata_differs_from(&existing.record) {
            return true;
        }
        match &self.products {
            ChildSet::Untouched => false,
            ChildSet::Replace(items) => !diff_children(&existing.products, items.iter()).is_noop(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Dimensions, Weight};
    use crate::money::Money;
    use crate::types::InvoiceNumber;
    use chrono::Utc;

    fn product(id: &str, box_id: &str, grams: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            box_id: box_id.to_string(),
            product_type: "GEN".to_string(),
            description: String::new(),
            weight: Weight::from_grams(grams),
            rate: Money::from_cents(100),
            quantity: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn input(id: Option<&str>, grams: i64) -> ProductInput {
        let mut p = ProductInput::new("GEN", "", Weight::from_grams(grams), Money::from_cents(100), 1);
        p.id = id.map(str::to_string);
        p
    }

    fn box_tree(id: &str, label: &str, products: Vec<Product>) -> BoxTree {
        let now = Utc::now();
        BoxTree {
            record: ShipmentBox {
                id: id.to_string(),
                invoice_number: InvoiceNumber::parse("INV-1").unwrap(),
                box_number: label.to_string(),
                dimensions: Dimensions::new(10, 10, 10),
                created_at: now,
                updated_at: now,
            },
            products,
        }
    }

    #[test]
    fn test_classifies_each_bucket() {
        let existing = vec![
            product("P1", "B1", 100),
            product("P2", "B1", 200),
            product("P3", "B1", 300),
        ];
        let submitted = vec![
            input(Some("P1"), 150),
            input(Some("P3"), 300),
            input(None, 50),
            input(Some("P9"), 90),
        ];

        let diff = diff_children(&existing, submitted);

        assert_eq!(diff.to_update.len(), 1);
        assert_eq!(diff.to_update[0].existing.id, "P1");
        assert_eq!(diff.to_update[0].submitted.weight.grams(), 150);
        assert_eq!(diff.unchanged, vec!["P3".to_string()]);
        assert_eq!(diff.to_add.len(), 2);
        assert_eq!(diff.to_add[1].submitted_id(), Some("P9"));
        assert_eq!(diff.to_delete.len(), 1);
        assert_eq!(diff.to_delete[0].id, "P2");
    }

    #[test]
    fn test_buckets_partition_the_key_union() {
        let existing = vec![product("A", "B", 1), product("B", "B", 2), product("C", "B", 3)];
        let submitted = vec![input(Some("A"), 1), input(Some("B"), 5), input(Some("D"), 4)];

        let diff = diff_children(&existing, submitted);

        let mut seen: Vec<String> = Vec::new();
        seen.extend(diff.to_update.iter().map(|m| m.existing.id.clone()));
        seen.extend(diff.to_add.iter().filter_map(|i| i.submitted_id().map(str::to_string)));
        seen.extend(diff.to_delete.iter().map(|e| e.id.clone()));
        seen.extend(diff.unchanged.iter().cloned());
        seen.sort();

        let before = seen.len();
        seen.dedup();
        assert_eq!(before, seen.len(), "buckets overlap");
        assert_eq!(seen, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_identical_submission_is_noop() {
        let existing = vec![product("P1", "B1", 100), product("P2", "B1", 200)];
        let submitted = vec![input(Some("P1"), 100), input(Some("P2"), 200)];

        let diff = diff_children(&existing, submitted);

        assert!(diff.is_noop());
        assert!(diff.to_update.is_empty());
        assert_eq!(diff.unchanged.len(), 2);
    }

    #[test]
    fn test_empty_submission_deletes_everything() {
        let existing = vec![product("P1", "B1", 100)];
        let diff = diff_children(&existing, Vec::<ProductInput>::new());
        assert_eq!(diff.to_delete.len(), 1);
        assert!(diff.to_add.is_empty());
    }

    #[test]
    fn test_box_with_changed_product_is_an_update() {
        let existing = vec![box_tree("B1", "Box 1", vec![product("P1", "B1", 5_000)])];
        let submitted = vec![BoxInput::new("Box 1", Dimensions::new(10, 10, 10))
            .with_id("B1")
            .with_products(vec![input(Some("P1"), 7_500)])];

        let diff = diff_children(&existing, submitted.iter());

        assert_eq!(diff.to_update.len(), 1);
        assert!(!diff.to_update[0]
            .submitted
            .metadata_differs_from(&diff.to_update[0].existing.record));
    }

    #[test]
    fn test_box_with_untouched_products_compares_metadata_only() {
        let existing = vec![box_tree("B1", "Box 1", vec![product("P1", "B1", 5_000)])];
        let submitted = vec![BoxInput::new("Box 1", Dimensions::new(10, 10, 10)).with_id("B1")];

        let diff = diff_children(&existing, submitted);

        assert!(diff.is_noop());
        assert_eq!(diff.unchanged, vec!["B1".to_string()]);
    }

    #[test]
    fn test_repeated_key_is_only_matched_once() {
        let existing = vec![product("P1", "B1", 100)];
        let submitted = vec![input(Some("P1"), 100), input(Some("P1"), 100)];

        let diff = diff_children(&existing, submitted);

        assert_eq!(diff.unchanged.len(), 1);
        assert_eq!(diff.to_add.len(), 1);
        assert!(diff.to_delete.is_empty());
    }
}
