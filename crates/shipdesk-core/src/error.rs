//! # Error Types
//!
//! Domain-specific error types for shipdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shipdesk-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Submission validation failures                 │
//! │                                                                         │
//! │  shipdesk-db errors (separate crate)                                   │
//! │  └── DbError          - SQLite operation failures                      │
//! │                                                                         │
//! │  shipdesk-sync errors (separate crate)                                 │
//! │  ├── StoreError       - Any backend failure, classified                │
//! │  └── SyncError        - What the editor layer sees                     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → StoreError → SyncError  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored status string is not one of the known statuses.
    ///
    /// ## When This Occurs
    /// - A row written by a newer client carries a status this build doesn't know
    /// - Manual edits to the database
    #[error("Unknown shipment status: {0}")]
    UnknownStatus(String),

    /// A stored master-data kind is not one of the known kinds.
    #[error("Unknown master data kind: {0}")]
    UnknownMasterKind(String),

    /// A stored measure is negative or out of range.
    #[error("Corrupt {field} on {entity} {id}: {value}")]
    CorruptMeasure {
        entity: String,
        id: String,
        field: String,
        value: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write so that a bad submission never half-applies.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. invoice number with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same child id appears twice in one submission.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },

    /// Too many children in one collection.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// A submitted child id is already owned by another parent.
    #[error("{field} '{value}' already belongs to {owner}")]
    ForeignId {
        field: String,
        value: String,
        owner: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::ForeignId`].
    pub fn foreign_id(
        field: impl Into<String>,
        value: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        ValidationError::ForeignId {
            field: field.into(),
            value: value.into(),
            owner: owner.into(),
        }
    }

    /// Shorthand for [`ValidationError::Duplicate`].
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        ValidationError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CorruptMeasure {
            entity: "product".to_string(),
            id: "P1".to_string(),
            field: "weight_grams".to_string(),
            value: -5,
        };
        assert_eq!(err.to_string(), "Corrupt weight_grams on product P1: -5");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("invoice_number").to_string(),
            "invoice_number is required"
        );
        assert_eq!(
            ValidationError::duplicate("box id", "B1").to_string(),
            "box id 'B1' appears more than once"
        );
        assert_eq!(
            ValidationError::foreign_id("box id", "B1", "shipment INV-A").to_string(),
            "box id 'B1' already belongs to shipment INV-A"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("box_number").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
