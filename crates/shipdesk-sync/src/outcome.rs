//! # Pass Outcomes
//!
//! What a reconciliation pass reports back to its caller.

use serde::Serialize;
use shipdesk_core::{InvoiceNumber, OrphanCounts};

/// Adds, updates and deletes at one level of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl ChangeCounts {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for ChangeCounts {
    fn add_assign(&mut self, other: ChangeCounts) {
        self.added += other.added;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

/// Result of one reconciliation pass.
///
/// Remote problems land in `remote_issues` instead of failing the pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub invoice: InvoiceNumber,

    /// Every local write of the pass succeeded.
    pub local_applied: bool,

    /// Every remote write of the pass succeeded. False when the remote leg
    /// was skipped or went down part way.
    pub remote_applied: bool,

    pub boxes: ChangeCounts,
    pub products: ChangeCounts,

    /// Local child deletes that failed.
    pub failed_deletes: usize,

    /// One line per remote failure, in the order they happened.
    pub remote_issues: Vec<String>,

    /// What the post-delete sweep removed locally.
    pub orphans: OrphanCounts,

    /// What the remote sweep removed, when one ran.
    pub remote_orphans: Option<OrphanCounts>,
}

impl ReconcileResult {
    pub fn new(invoice: InvoiceNumber) -> Self {
        ReconcileResult {
            invoice,
            local_applied: false,
            remote_applied: false,
            boxes: ChangeCounts::default(),
            products: ChangeCounts::default(),
            failed_deletes: 0,
            remote_issues: Vec::new(),
            orphans: OrphanCounts::default(),
            remote_orphans: None,
        }
    }

    /// True when the pass changed no boxes or products.
    pub fn is_noop(&self) -> bool {
        self.boxes.is_empty() && self.products.is_empty()
    }
}
