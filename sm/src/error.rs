//! Migration error types

use statestore::{LockInfo, StoreError};
use thiserror::Error;

/// Why a lock could not be taken
#[derive(Debug, Error)]
pub enum LockFailure {
    #[error("timed out waiting for the lock\n{0}")]
    Timeout(Box<LockInfo>),

    #[error("cancelled while waiting for the lock")]
    Cancelled,

    #[error(transparent)]
    Store(StoreError),
}

/// Errors that can occur while migrating state between backends
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A backend could not be enumerated, or a workspace could not be loaded.
    /// Nothing has been modified in either backend.
    #[error(
        "error loading state from the {backend:?} backend: {source}\n\n\
         State migration cannot continue until the state can be loaded. The state in both \
         the source and the destination remains unmodified."
    )]
    Load {
        backend: String,
        #[source]
        source: StoreError,
    },

    #[error("the {backend:?} backend rejected workspace {workspace:?}: {detail}")]
    VersionCompatibility {
        backend: String,
        workspace: String,
        detail: String,
    },

    #[error("error asking for state migration action: {0}")]
    Confirmation(String),

    #[error("invalid workspace rename pattern: {0}")]
    PatternValidation(String),

    #[error("error acquiring lock on the {operation}: {source}")]
    Lock {
        operation: String,
        #[source]
        source: LockFailure,
    },

    #[error(
        "error copying state from the {source_type:?} backend to the {destination_type:?} backend: {source}\n\n\
         The state in the {source_type:?} backend remains intact and unmodified."
    )]
    Copy {
        source_type: String,
        destination_type: String,
        #[source]
        source: StoreError,
    },

    /// A bulk migration stopped partway through its sorted workspace list
    #[error(
        "error migrating workspace {workspace:?} from the {source_type:?} backend to the \
         {destination_type:?} backend: {source}\n\n\
         Workspaces are copied in alphabetical order. Workspaces before {workspace:?} have been \
         copied; workspaces after it have not been modified in the destination. No workspace in \
         the source has been modified. Resolve the error and run the migration again to continue."
    )]
    PartialMigration {
        workspace: String,
        source_type: String,
        destination_type: String,
        #[source]
        source: Box<MigrateError>,
    },

    #[error("migration aborted by user")]
    Aborted,

    /// Interrupted before the next workspace was touched
    #[error("migration cancelled by interrupt")]
    Cancelled,

    #[error("error exporting state for review: {0}")]
    Export(#[source] StoreError),

    #[error("workspace selection failed: {0}")]
    Selection(String),
}

impl MigrateError {
    pub fn load(backend: impl Into<String>, source: StoreError) -> Self {
        Self::Load {
            backend: backend.into(),
            source,
        }
    }

    pub fn copy(source_type: impl Into<String>, destination_type: impl Into<String>, source: StoreError) -> Self {
        Self::Copy {
            source_type: source_type.into(),
            destination_type: destination_type.into(),
            source,
        }
    }

    pub fn lock(operation: impl Into<String>, source: LockFailure) -> Self {
        Self::Lock {
            operation: operation.into(),
            source,
        }
    }

    /// The workspace a partial bulk migration stopped on
    pub fn failed_workspace(&self) -> Option<&str> {
        match self {
            Self::PartialMigration { workspace, .. } => Some(workspace),
            _ => None,
        }
    }

    /// Format the error with any causes its message does not already include
    pub fn format_detailed(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            let text = err.to_string();
            if !out.contains(&text) {
                out.push_str(&format!("\n  caused by: {}", text));
            }
            cause = err.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
