//! Temporary on-disk copies of both states, for review before an overwrite

use statestore::{SnapshotMeta, StateFile, StateManager, StoreError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Both states written into a private directory that is removed on drop
#[derive(Debug)]
pub struct TempExport {
    dir: TempDir,
    source_path: PathBuf,
    destination_path: PathBuf,
}

impl TempExport {
    /// Write `1-<source type>.json` and `2-<destination type>.json`
    pub fn write(
        source: &dyn StateManager,
        source_type: &str,
        destination: &dyn StateManager,
        destination_type: &str,
    ) -> Result<Self> {
        debug!(%source_type, %destination_type, "TempExport::write: called");
        let dir = tempfile::Builder::new()
            .prefix("sm-migrate-")
            .tempdir()
            .map_err(|e| MigrateError::Export(StoreError::Io(e)))?;

        let source_path = dir.path().join(format!("1-{}.json", source_type));
        let destination_path = dir.path().join(format!("2-{}.json", destination_type));
        exportable(source)
            .write_atomic(&source_path)
            .map_err(MigrateError::Export)?;
        exportable(destination)
            .write_atomic(&destination_path)
            .map_err(MigrateError::Export)?;

        Ok(Self {
            dir,
            source_path,
            destination_path,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }
}

/// The manager's state as a file; content-only managers get a throwaway lineage
fn exportable(manager: &dyn StateManager) -> StateFile {
    manager.state_for_migration().unwrap_or_else(|| {
        StateFile::new(manager.state().cloned().unwrap_or_default(), SnapshotMeta::fresh())
    })
}
