//! Snapshot bookkeeping shared by the bundled state managers

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::snapshot::{SnapshotMeta, StateFile, StateSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Content changed through `write_state`; the serial advances on persist
    Changed,
    /// Content and metadata adopted from another manager; written as-is
    Migrated,
}

/// Cached snapshot, its metadata and whatever is staged for the next persist
#[derive(Debug, Default)]
pub(crate) struct Staged {
    state: Option<StateSnapshot>,
    meta: Option<SnapshotMeta>,
    pending: Option<Pending>,
}

impl Staged {
    /// Replace the cache with what storage holds; drops anything staged
    pub(crate) fn load(&mut self, file: Option<StateFile>) {
        match file {
            Some(file) => {
                self.meta = Some(file.meta());
                self.state = Some(file.state);
            }
            None => {
                self.meta = None;
                self.state = None;
            }
        }
        self.pending = None;
    }

    pub(crate) fn state(&self) -> Option<&StateSnapshot> {
        self.state.as_ref()
    }

    pub(crate) fn meta(&self) -> Option<SnapshotMeta> {
        self.meta.clone()
    }

    pub(crate) fn write(&mut self, state: StateSnapshot) {
        if self.state.as_ref() != Some(&state) {
            self.pending = Some(Pending::Changed);
        }
        self.state = Some(state);
    }

    /// Adopt an incoming file; unless forced, it must continue the existing lineage
    pub(crate) fn adopt(&mut self, file: StateFile, force: bool) -> Result<()> {
        debug!(lineage = %file.lineage, serial = file.serial, force, "Staged::adopt: called");
        if !force && let Some(existing) = &self.meta {
            if existing.lineage != file.lineage {
                return Err(StoreError::LineageMismatch {
                    existing: existing.lineage.clone(),
                    incoming: file.lineage,
                });
            }
            if file.serial < existing.serial {
                return Err(StoreError::SerialRegression {
                    existing: existing.serial,
                    incoming: file.serial,
                });
            }
        }

        self.meta = Some(file.meta());
        self.state = Some(file.state);
        self.pending = Some(Pending::Migrated);
        Ok(())
    }

    /// Current snapshot with metadata, when both exist
    pub(crate) fn export(&self) -> Option<StateFile> {
        match (&self.state, &self.meta) {
            (Some(state), Some(meta)) => Some(StateFile::new(state.clone(), meta.clone())),
            _ => None,
        }
    }

    /// File the next persist should write, or `None` when nothing is staged
    pub(crate) fn to_persist(&self) -> Result<Option<StateFile>> {
        let Some(pending) = self.pending else {
            return Ok(None);
        };
        let mut meta = self.meta.clone().unwrap_or_else(SnapshotMeta::fresh);
        if pending == Pending::Changed {
            meta.serial = meta
                .serial
                .checked_add(1)
                .ok_or_else(|| StoreError::SerialOutOfRange(format!("{} + 1", meta.serial)))?;
        }
        Ok(Some(StateFile::new(self.state.clone().unwrap_or_default(), meta)))
    }

    /// Record that `file` reached storage
    pub(crate) fn persisted(&mut self, file: &StateFile) {
        self.meta = Some(file.meta());
        self.pending = None;
    }
}
