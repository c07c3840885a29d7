//! State snapshots and their self-contained file form

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// Current on-disk format version for [`StateFile`]
pub const STATE_FORMAT_VERSION: u32 = 1;

/// In-memory representation of one workspace's resources
///
/// Equality is content equality only; two snapshots with the same resources
/// but different lineage compare equal here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Managed resources keyed by address (e.g. `aws_instance.web`)
    #[serde(default)]
    pub resources: BTreeMap<String, Value>,

    /// Root output values
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

impl StateSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to add a resource
    pub fn with_resource(mut self, address: impl Into<String>, value: Value) -> Self {
        self.resources.insert(address.into(), value);
        self
    }

    /// Builder-style helper to add an output
    pub fn with_output(mut self, name: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(name.into(), value);
        self
    }

    /// A snapshot is empty when it tracks no resources and no outputs
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }
}

/// Lineage and serial of a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Identifies one independent history of a workspace's state
    pub lineage: String,

    /// Monotonically increasing version within the lineage
    pub serial: u64,
}

impl SnapshotMeta {
    /// Start a brand new lineage at serial 0
    pub fn fresh() -> Self {
        let lineage = Uuid::now_v7().to_string();
        debug!(%lineage, "SnapshotMeta::fresh: called");
        Self { lineage, serial: 0 }
    }
}

/// Self-contained serialized snapshot: content plus identity metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFile {
    pub format_version: u32,

    /// Version of the tool that wrote the file
    pub tool_version: String,

    pub lineage: String,

    pub serial: u64,

    #[serde(flatten)]
    pub state: StateSnapshot,
}

impl StateFile {
    pub fn new(state: StateSnapshot, meta: SnapshotMeta) -> Self {
        Self {
            format_version: STATE_FORMAT_VERSION,
            tool_version: crate::TOOL_VERSION.to_string(),
            lineage: meta.lineage,
            serial: meta.serial,
            state,
        }
    }

    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            lineage: self.lineage.clone(),
            serial: self.serial,
        }
    }

    /// Parse a state file, rejecting format versions newer than this tool understands
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let file: StateFile = serde_json::from_slice(bytes)?;
        if file.format_version > STATE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat(file.format_version));
        }
        Ok(file)
    }

    pub fn to_vec_pretty(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Read a state file; a missing file is `Ok(None)`
    pub fn read(path: &Path) -> Result<Option<Self>> {
        debug!(path = %path.display(), "StateFile::read: called");
        match fs::read(path) {
            Ok(bytes) => Ok(Some(Self::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the file atomically: stage in the same directory, then rename over the target
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), serial = self.serial, "StateFile::write_atomic: called");
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(&self.to_vec_pretty()?)?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}
