//! # CLI Error Type
//!
//! Every command returns `Result<_, CliError>`. On failure `main` prints
//! the error as JSON on stderr and exits with the code's status.
//!
//! ```json
//! { "code": "REMOTE_UNREACHABLE", "message": "Remote store unreachable: ..." }
//! ```

use serde::Serialize;
use shipdesk_core::CoreError;
use shipdesk_db::DbError;
use shipdesk_sync::{StoreError, SyncError};

#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad command line.
    Usage,
    /// Config file missing, unreadable or invalid.
    Config,
    NotFound,
    /// Submitted data rejected.
    ValidationError,
    /// The local database failed.
    LocalStore,
    /// Some child deletes failed; re-run to finish.
    Incomplete,
    RemoteUnreachable,
    RemoteUnauthorized,
    /// The remote answered with an error.
    RemoteFailed,
    Busy,
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_status(self) -> i32 {
        match self {
            ErrorCode::Usage => 2,
            ErrorCode::Config => 3,
            ErrorCode::NotFound => 4,
            ErrorCode::ValidationError => 5,
            ErrorCode::LocalStore => 6,
            ErrorCode::Incomplete => 7,
            ErrorCode::RemoteUnreachable
            | ErrorCode::RemoteUnauthorized
            | ErrorCode::RemoteFailed => 8,
            ErrorCode::Busy => 9,
            ErrorCode::Internal => 1,
        }
    }
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Usage, message)
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        let code = match &err {
            SyncError::InvalidConfig(_)
            | SyncError::InvalidUrl(_)
            | SyncError::ConfigLoadFailed(_)
            | SyncError::ConfigSaveFailed(_) => ErrorCode::Config,
            SyncError::Validation(_) => ErrorCode::ValidationError,
            SyncError::LocalUnavailable { .. } => ErrorCode::LocalStore,
            SyncError::DeleteIncomplete { .. } => ErrorCode::Incomplete,
            SyncError::RemoteUnreachable(_) | SyncError::RemoteTimeout { .. } => {
                ErrorCode::RemoteUnreachable
            }
            SyncError::RemoteUnauthorized => ErrorCode::RemoteUnauthorized,
            SyncError::RemoteFailed(_) => ErrorCode::RemoteFailed,
            SyncError::AlreadyRunning => ErrorCode::Busy,
        };
        CliError::new(code, err.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::Unauthorized => ErrorCode::RemoteUnauthorized,
            StoreError::Backend(_) => ErrorCode::RemoteFailed,
            _ => ErrorCode::RemoteUnreachable,
        };
        CliError::new(code, err.to_string())
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            DbError::InvalidData(core) => CliError::from(core),
            other => {
                tracing::error!("Local database error: {}", other);
                CliError::new(ErrorCode::LocalStore, other.to_string())
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => CliError::new(ErrorCode::ValidationError, v.to_string()),
            other => CliError::usage(other.to_string()),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}
