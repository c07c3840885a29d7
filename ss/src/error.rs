//! Storage error types

use thiserror::Error;

use crate::lock::LockInfo;

/// Errors from backends and state managers
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend has exactly one implicit workspace and cannot enumerate
    #[error("workspaces not supported")]
    WorkspacesNotSupported,

    /// The backend requires every workspace to carry an explicit name
    #[error("default workspace not supported: an explicit workspace name is required")]
    DefaultWorkspaceNotSupported,

    #[error("invalid workspace name {name:?}: {reason}")]
    InvalidWorkspaceName { name: String, reason: String },

    /// Someone else holds the lock
    #[error("state is locked\n{0}")]
    Locked(Box<LockInfo>),

    #[error("lock {id} is not held on this state")]
    LockNotHeld { id: String },

    #[error("lineage mismatch: state has lineage {existing:?}, incoming state has {incoming:?}")]
    LineageMismatch { existing: String, incoming: String },

    #[error("serial regression: state is at serial {existing}, incoming state has serial {incoming}")]
    SerialRegression { existing: u64, incoming: u64 },

    /// The serial cannot be advanced or does not fit the backend's storage
    #[error("state serial {0} is out of range")]
    SerialOutOfRange(String),

    #[error("unsupported state format version {0}")]
    UnsupportedFormat(u32),

    /// Anything the backend itself refuses to do (fault injection, read-only stores)
    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// True when the error is the "lock held elsewhere" condition that is worth retrying
    pub fn is_locked(&self) -> bool {
        matches!(self, StoreError::Locked(_))
    }
}

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;
