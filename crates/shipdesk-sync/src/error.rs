//! # Sync Error Types
//!
//! Error types for reconciliation and bulk sync.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Local leg     │  │     Remote leg          │ │
//! │  │                 │  │   (fatal)       │  │  (recorded in results)  │ │
//! │  │  InvalidConfig  │  │                 │  │                         │ │
//! │  │  InvalidUrl     │  │  LocalUnavail.  │  │  RemoteUnreachable      │ │
//! │  │  ConfigLoad/Save│  │  DeleteIncompl. │  │  RemoteUnauthorized     │ │
//! │  └─────────────────┘  └─────────────────┘  │  RemoteTimeout          │ │
//! │                                             └─────────────────────────┘ │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   Submission    │  │   Coordinator   │                              │
//! │  │                 │  │                 │                              │
//! │  │  Validation     │  │  AlreadyRunning │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::time::Duration;

use shipdesk_core::ValidationError;
use shipdesk_db::DbError;
use thiserror::Error;

use crate::outcome::ReconcileResult;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type alias for a single store call.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Store Errors
// =============================================================================

/// Failure of one call against a [`ShipmentStore`](crate::store::ShipmentStore).
///
/// The executor decides what a failure means from the leg it came from: any
/// local failure aborts the pass, a remote one only takes the remote leg down.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot serve requests at all.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Network path to the backend is down.
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    /// No signed-in user for a store that requires one.
    #[error("Not signed in to the remote store")]
    Unauthorized,

    /// The call did not finish in time.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with an error.
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionFailed(msg) => StoreError::Unavailable(msg),
            DbError::PoolExhausted => StoreError::Unavailable("connection pool exhausted".into()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io) => StoreError::Unreachable(io.to_string()),
            sqlx::Error::Tls(tls) => StoreError::Unreachable(tls.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Unreachable("connection pool timed out".into()),
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

// =============================================================================
// Sync Errors
// =============================================================================

/// Sync error type covering every failure a caller can see.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote database URL.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Submission Errors
    // =========================================================================
    /// The submitted tree was rejected before any write.
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Local Leg Errors
    // =========================================================================
    /// A write or read against the local store failed.
    ///
    /// ## When This Occurs
    /// - Database file locked or removed
    /// - Disk full
    /// - A stored row no longer decodes
    #[error("Local store failed during {operation}: {message}")]
    LocalUnavailable { operation: String, message: String },

    /// Some local child deletes failed. Their parents were kept.
    ///
    /// `result` is the rest of the pass, which was still applied.
    #[error("{failed} local deletes failed; parents of failed children were kept")]
    DeleteIncomplete {
        failed: usize,
        result: Box<ReconcileResult>,
    },

    // =========================================================================
    // Remote Leg Errors
    // =========================================================================
    /// Remote store can't be reached.
    #[error("Remote store unreachable: {0}")]
    RemoteUnreachable(String),

    /// Remote store requires a signed-in user.
    #[error("Remote store requires a signed-in user")]
    RemoteUnauthorized,

    /// A remote operation hit its time limit.
    #[error("Remote {operation} timed out after {after:?}")]
    RemoteTimeout { operation: String, after: Duration },

    /// The remote store rejected an operation.
    #[error("Remote store error: {0}")]
    RemoteFailed(String),

    // =========================================================================
    // Coordinator Errors
    // =========================================================================
    /// A bulk sync is already in progress.
    #[error("A sync is already running")]
    AlreadyRunning,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl SyncError {
    /// Wraps a local store failure with the operation that hit it.
    pub fn local(operation: impl fmt::Display, err: StoreError) -> Self {
        SyncError::LocalUnavailable {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    /// Maps a remote store failure onto the remote variants.
    pub fn remote(operation: impl fmt::Display, err: StoreError) -> Self {
        match err {
            StoreError::Unreachable(msg) | StoreError::Unavailable(msg) => {
                SyncError::RemoteUnreachable(msg)
            }
            StoreError::Unauthorized => SyncError::RemoteUnauthorized,
            StoreError::Timeout(after) => SyncError::RemoteTimeout {
                operation: operation.to_string(),
                after,
            },
            StoreError::Backend(msg) => SyncError::RemoteFailed(format!("{operation}: {msg}")),
        }
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the operation can be retried as-is.
    ///
    /// ## Retryable Errors
    /// - Remote unreachable
    /// - Remote timeouts
    ///
    /// ## Non-Retryable Errors
    /// - Unauthorized (signing in again is a user action)
    /// - Local failures
    /// - Validation and configuration errors
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnreachable(_) | SyncError::RemoteTimeout { .. }
        )
    }

    /// Returns true if this error came from the remote leg.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnreachable(_)
                | SyncError::RemoteUnauthorized
                | SyncError::RemoteTimeout { .. }
                | SyncError::RemoteFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
