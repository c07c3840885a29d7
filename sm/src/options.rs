//! Per-run migration options

use statestore::{Backend, DEFAULT_WORKSPACE};
use std::fmt;
use std::sync::Arc;

/// Source and destination of one migration, plus the per-copy cursor
///
/// The backends and their type tags are fixed at construction. The workspace
/// names and `force` flag change as the planner walks workspaces.
pub struct MigrationOptions {
    source: Arc<dyn Backend>,
    source_type: String,
    destination: Arc<dyn Backend>,
    destination_type: String,

    /// Workspace read from the source by the next copy
    pub source_workspace: String,

    /// Workspace written in the destination by the next copy
    pub destination_workspace: String,

    /// Skip per-workspace confirmations
    pub force: bool,
}

impl MigrationOptions {
    /// Options whose type tags come from the backends themselves
    pub fn new(source: Arc<dyn Backend>, destination: Arc<dyn Backend>) -> Self {
        let source_type = source.backend_type().to_string();
        let destination_type = destination.backend_type().to_string();
        Self::with_types(source, source_type, destination, destination_type)
    }

    pub fn with_types(
        source: Arc<dyn Backend>,
        source_type: impl Into<String>,
        destination: Arc<dyn Backend>,
        destination_type: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_type: source_type.into(),
            destination,
            destination_type: destination_type.into(),
            source_workspace: DEFAULT_WORKSPACE.to_string(),
            destination_workspace: DEFAULT_WORKSPACE.to_string(),
            force: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn source(&self) -> &dyn Backend {
        self.source.as_ref()
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn destination(&self) -> &dyn Backend {
        self.destination.as_ref()
    }

    pub fn destination_type(&self) -> &str {
        &self.destination_type
    }
}

impl fmt::Debug for MigrationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationOptions")
            .field("source_type", &self.source_type)
            .field("destination_type", &self.destination_type)
            .field("source_workspace", &self.source_workspace)
            .field("destination_workspace", &self.destination_workspace)
            .field("force", &self.force)
            .finish()
    }
}
