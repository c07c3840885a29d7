//! Backend, StateManager and Locker traits
//!
//! These are the seams the migration engine is written against. A backend
//! enumerates workspaces and hands out one [`StateManager`] per workspace; a
//! manager owns the lifecycle of that workspace's snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DEFAULT_WORKSPACE;
use crate::error::{Result, StoreError};
use crate::lock::LockInfo;
use crate::name::validate_workspace_name;
use crate::snapshot::{SnapshotMeta, StateFile, StateSnapshot};

/// How a backend constrains workspace names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum WorkspaceNaming {
    /// Names are local to this configuration; copy them as-is
    #[default]
    Free,

    /// Configured for exactly one named workspace; behaves as single-state
    Fixed { name: String },

    /// Names must be unique beyond this configuration; migrations offer a rename pattern
    #[serde(rename = "unique")]
    GloballyUnique,
}

/// Settings every bundled backend understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackendSettings {
    /// Whether named workspaces are supported at all
    pub workspaces: bool,

    /// Whether the implicit `default` workspace may be used
    pub default_workspace: bool,

    pub naming: WorkspaceNaming,

    /// Pattern (one `*`) this backend already uses to derive its workspace names
    pub workspace_pattern: Option<String>,

    /// Whether the backend is a hosted/managed service (affects prompt wording)
    pub managed: bool,

    /// Tool version (major.minor) the stored workspaces require
    pub required_version: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            workspaces: true,
            default_workspace: true,
            naming: WorkspaceNaming::Free,
            workspace_pattern: None,
            managed: false,
            required_version: None,
        }
    }
}

impl BackendSettings {
    /// Settings for a backend with exactly one implicit workspace
    pub fn single() -> Self {
        Self {
            workspaces: false,
            ..Default::default()
        }
    }

    /// Check that `name` may be opened under these settings
    pub fn check_workspace(&self, name: &str) -> Result<()> {
        debug!(%name, "BackendSettings::check_workspace: called");
        validate_workspace_name(name)?;
        if name == DEFAULT_WORKSPACE && !self.default_workspace {
            return Err(StoreError::DefaultWorkspaceNotSupported);
        }
        if !self.workspaces && name != DEFAULT_WORKSPACE {
            return Err(StoreError::WorkspacesNotSupported);
        }
        Ok(())
    }

    /// Turn the names a backend has stored into the list it reports
    pub fn visible_workspaces(&self, mut stored: Vec<String>) -> Result<Vec<String>> {
        debug!(stored = stored.len(), "BackendSettings::visible_workspaces: called");
        if !self.workspaces {
            return Err(StoreError::WorkspacesNotSupported);
        }
        if let WorkspaceNaming::Fixed { name } = &self.naming {
            return Ok(vec![name.clone()]);
        }
        if self.default_workspace {
            stored.push(DEFAULT_WORKSPACE.to_string());
        } else {
            stored.retain(|n| n != DEFAULT_WORKSPACE);
        }
        stored.sort();
        stored.dedup();
        Ok(stored)
    }
}

/// A pluggable storage provider for workspace state
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short type tag used in messages ("local", "sqlite", ...)
    fn backend_type(&self) -> &'static str;

    /// List workspace names, or `StoreError::WorkspacesNotSupported`
    async fn workspaces(&self) -> Result<Vec<String>>;

    /// Manager for one workspace, or `StoreError::DefaultWorkspaceNotSupported`
    /// when `workspace` is the default and the backend requires explicit names
    async fn state_manager(&self, workspace: &str) -> Result<Box<dyn StateManager>>;

    fn naming(&self) -> WorkspaceNaming {
        WorkspaceNaming::Free
    }

    /// Pattern this backend already used to name its workspaces, if any
    fn workspace_name_pattern(&self) -> Option<String> {
        None
    }

    fn is_managed(&self) -> bool {
        false
    }

    /// Tool version the given workspace requires, if the backend tracks one
    async fn remote_version(&self, _workspace: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Lifecycle of one workspace's snapshot
#[async_trait]
pub trait StateManager: Send {
    /// Pull the latest snapshot from the source of truth
    async fn refresh_state(&mut self) -> Result<()>;

    /// Cached snapshot from the last refresh or write; `None` when nothing is stored
    fn state(&self) -> Option<&StateSnapshot>;

    /// Stage a new snapshot in memory
    fn write_state(&mut self, state: StateSnapshot) -> Result<()>;

    /// Write the staged snapshot back to storage
    async fn persist_state(&mut self) -> Result<()>;

    /// Lineage and serial, for managers that track them
    fn snapshot_meta(&self) -> Option<SnapshotMeta> {
        None
    }

    /// Snapshot plus metadata for a migration transfer
    fn state_for_migration(&self) -> Option<StateFile> {
        None
    }

    /// Adopt an incoming snapshot, letting the manager reconcile identity metadata
    fn write_state_for_migration(&mut self, file: StateFile, _force: bool) -> Result<()> {
        self.write_state(file.state)
    }

    /// Lock capability, for managers that support it
    fn locker(&mut self) -> Option<&mut dyn Locker> {
        None
    }
}

/// Advisory lock on one workspace's state
#[async_trait]
pub trait Locker: Send {
    /// Acquire the lock; returns the lock ID or `StoreError::Locked` with the holder's info
    async fn lock(&mut self, info: &LockInfo) -> Result<String>;

    async fn unlock(&mut self, id: &str) -> Result<()>;
}

/// Copy `src` into `dst`, preserving lineage/serial where both sides support it
///
/// Only `dst` is written. The destination still has to be persisted.
pub fn migrate(dst: &mut dyn StateManager, src: &dyn StateManager) -> Result<()> {
    match src.state_for_migration() {
        Some(file) => {
            debug!(lineage = %file.lineage, serial = file.serial, "migrate: transferring with metadata");
            dst.write_state_for_migration(file, true)
        }
        None => {
            debug!("migrate: source has no metadata, transferring content only");
            dst.write_state(src.state().cloned().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_settings_reject_named_workspaces() {
        let settings = BackendSettings::single();
        assert!(settings.check_workspace(DEFAULT_WORKSPACE).is_ok());
        assert!(matches!(
            settings.check_workspace("prod"),
            Err(StoreError::WorkspacesNotSupported)
        ));
        assert!(matches!(
            settings.visible_workspaces(vec![]),
            Err(StoreError::WorkspacesNotSupported)
        ));
    }

    #[test]
    fn test_default_workspace_can_be_disallowed() {
        let settings = BackendSettings {
            default_workspace: false,
            ..Default::default()
        };
        assert!(matches!(
            settings.check_workspace(DEFAULT_WORKSPACE),
            Err(StoreError::DefaultWorkspaceNotSupported)
        ));
        let visible = settings
            .visible_workspaces(vec!["default".to_string(), "prod".to_string()])
            .unwrap();
        assert_eq!(visible, vec!["prod".to_string()]);
    }

    #[test]
    fn test_visible_workspaces_sorted_with_default() {
        let visible = BackendSettings::default()
            .visible_workspaces(vec!["staging".to_string(), "prod".to_string()])
            .unwrap();
        assert_eq!(visible, vec!["default", "prod", "staging"]);
    }

    #[test]
    fn test_fixed_naming_reports_one_workspace() {
        let settings = BackendSettings {
            naming: WorkspaceNaming::Fixed {
                name: "networking".to_string(),
            },
            ..Default::default()
        };
        let visible = settings.visible_workspaces(vec!["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(visible, vec!["networking"]);
    }

    #[test]
    fn test_naming_yaml_shape() {
        let naming: WorkspaceNaming = serde_yaml::from_str("strategy: fixed\nname: prod\n").unwrap();
        assert_eq!(
            naming,
            WorkspaceNaming::Fixed {
                name: "prod".to_string()
            }
        );
        let unique: WorkspaceNaming = serde_yaml::from_str("strategy: unique\n").unwrap();
        assert_eq!(unique, WorkspaceNaming::GloballyUnique);
    }
}
