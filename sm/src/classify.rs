//! Single- vs multi-workspace classification of a backend

use statestore::{Backend, StoreError};
use tracing::debug;

use crate::error::{MigrateError, Result};

/// What a backend looks like from the migration's point of view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Workspace names as reported; empty for single-state backends
    pub workspaces: Vec<String>,

    pub single_state: bool,
}

/// Enumerate `backend`; "workspaces not supported" means single-state
pub async fn classify(backend: &dyn Backend, type_tag: &str) -> Result<Classification> {
    debug!(%type_tag, "classify: called");
    match backend.workspaces().await {
        Ok(workspaces) => Ok(Classification {
            workspaces,
            single_state: false,
        }),
        Err(StoreError::WorkspacesNotSupported) => {
            debug!(%type_tag, "classify: backend is single-state");
            Ok(Classification {
                workspaces: Vec::new(),
                single_state: true,
            })
        }
        Err(e) => Err(MigrateError::load(type_tag, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statestore::{MemoryBackend, StateSnapshot};

    #[tokio::test]
    async fn test_single_state_backend() {
        let classification = classify(&MemoryBackend::single(), "memory").await.unwrap();
        assert!(classification.single_state);
        assert!(classification.workspaces.is_empty());
    }

    #[tokio::test]
    async fn test_multi_state_backend() {
        let backend = MemoryBackend::multi().with_workspace("prod", StateSnapshot::new());
        let classification = classify(&backend, "memory").await.unwrap();
        assert!(!classification.single_state);
        assert_eq!(classification.workspaces, vec!["default", "prod"]);
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_load_error() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("state");
        let backend = statestore::FsBackend::open(&root, Default::default()).unwrap();
        // A file where the workspaces directory should be makes enumeration fail
        std::fs::write(root.join(statestore::fs::WORKSPACES_DIR), b"not a directory").unwrap();

        match classify(&backend, "local").await {
            Err(MigrateError::Load { backend, .. }) => assert_eq!(backend, "local"),
            other => panic!("expected Load error, got {other:?}"),
        }
    }
}
