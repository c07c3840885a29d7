//! In-memory backend
//!
//! All managers handed out by one [`MemoryBackend`] (and its clones) share a
//! single store, so a test can seed workspaces, run a migration and then
//! inspect what was persisted, in what order, and which locks are held.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::backend::{Backend, BackendSettings, Locker, StateManager, WorkspaceNaming};
use crate::error::{Result, StoreError};
use crate::lock::LockInfo;
use crate::snapshot::{SnapshotMeta, StateFile, StateSnapshot};
use crate::staged::Staged;

#[derive(Debug, Default)]
struct Store {
    files: BTreeMap<String, StateFile>,
    locks: BTreeMap<String, LockInfo>,
    persisted: Vec<String>,
    fail_persist: HashSet<String>,
}

/// Workspace state held in process memory
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<Mutex<Store>>,
    settings: BackendSettings,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(BackendSettings::default())
    }
}

impl MemoryBackend {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            settings,
        }
    }

    /// Backend with named workspace support
    pub fn multi() -> Self {
        Self::default()
    }

    /// Backend with only the implicit default workspace
    pub fn single() -> Self {
        Self::new(BackendSettings::single())
    }

    /// Seed a workspace with `state` under a fresh lineage at serial 1
    pub fn with_workspace(self, name: &str, state: StateSnapshot) -> Self {
        let meta = SnapshotMeta {
            serial: 1,
            ..SnapshotMeta::fresh()
        };
        self.with_workspace_meta(name, state, meta)
    }

    /// Seed a workspace with explicit lineage and serial
    pub fn with_workspace_meta(self, name: &str, state: StateSnapshot, meta: SnapshotMeta) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.files.insert(name.to_string(), StateFile::new(state, meta));
        }
        self
    }

    pub fn with_naming(mut self, naming: WorkspaceNaming) -> Self {
        self.settings.naming = naming;
        self
    }

    pub fn with_workspace_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.settings.workspace_pattern = Some(pattern.into());
        self
    }

    pub fn with_managed(mut self, managed: bool) -> Self {
        self.settings.managed = managed;
        self
    }

    pub fn with_default_workspace(mut self, allowed: bool) -> Self {
        self.settings.default_workspace = allowed;
        self
    }

    pub fn with_required_version(mut self, version: impl Into<String>) -> Self {
        self.settings.required_version = Some(version.into());
        self
    }

    /// Make every persist of `name` fail with `StoreError::Backend`
    pub fn with_persist_failure(self, name: &str) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.fail_persist.insert(name.to_string());
        }
        self
    }

    /// Stored snapshot of `name`, if any
    pub fn snapshot(&self, name: &str) -> Option<StateSnapshot> {
        self.lock_store().ok()?.files.get(name).map(|f| f.state.clone())
    }

    /// Stored lineage and serial of `name`, if any
    pub fn meta(&self, name: &str) -> Option<SnapshotMeta> {
        self.lock_store().ok()?.files.get(name).map(StateFile::meta)
    }

    /// Workspaces in the order they were persisted
    pub fn persisted_workspaces(&self) -> Vec<String> {
        self.lock_store().map(|s| s.persisted.clone()).unwrap_or_default()
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.lock_store().map(|s| s.locks.contains_key(name)).unwrap_or(false)
    }

    /// Hold a lock on `name` as if another process had taken it
    pub fn hold_lock(&self, name: &str, info: LockInfo) {
        if let Ok(mut store) = self.store.lock() {
            store.locks.insert(name.to_string(), info);
        }
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, Store>> {
        lock_store(&self.store)
    }
}

fn lock_store(store: &Mutex<Store>) -> Result<MutexGuard<'_, Store>> {
    store
        .lock()
        .map_err(|_| StoreError::Backend("memory store mutex poisoned".to_string()))
}

#[async_trait]
impl Backend for MemoryBackend {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn workspaces(&self) -> Result<Vec<String>> {
        debug!("MemoryBackend::workspaces: called");
        let stored = self.lock_store()?.files.keys().cloned().collect();
        self.settings.visible_workspaces(stored)
    }

    async fn state_manager(&self, workspace: &str) -> Result<Box<dyn StateManager>> {
        debug!(%workspace, "MemoryBackend::state_manager: called");
        self.settings.check_workspace(workspace)?;
        Ok(Box::new(MemoryStateManager {
            store: self.store.clone(),
            workspace: workspace.to_string(),
            staged: Staged::default(),
        }))
    }

    fn naming(&self) -> WorkspaceNaming {
        self.settings.naming.clone()
    }

    fn workspace_name_pattern(&self) -> Option<String> {
        self.settings.workspace_pattern.clone()
    }

    fn is_managed(&self) -> bool {
        self.settings.managed
    }

    async fn remote_version(&self, _workspace: &str) -> Result<Option<String>> {
        Ok(self.settings.required_version.clone())
    }
}

/// State manager for one in-memory workspace
pub struct MemoryStateManager {
    store: Arc<Mutex<Store>>,
    workspace: String,
    staged: Staged,
}

#[async_trait]
impl StateManager for MemoryStateManager {
    async fn refresh_state(&mut self) -> Result<()> {
        debug!(workspace = %self.workspace, "MemoryStateManager::refresh_state: called");
        let file = lock_store(&self.store)?.files.get(&self.workspace).cloned();
        self.staged.load(file);
        Ok(())
    }

    fn state(&self) -> Option<&StateSnapshot> {
        self.staged.state()
    }

    fn write_state(&mut self, state: StateSnapshot) -> Result<()> {
        self.staged.write(state);
        Ok(())
    }

    async fn persist_state(&mut self) -> Result<()> {
        debug!(workspace = %self.workspace, "MemoryStateManager::persist_state: called");
        let Some(file) = self.staged.to_persist()? else {
            return Ok(());
        };

        {
            let mut store = lock_store(&self.store)?;
            if store.fail_persist.contains(&self.workspace) {
                return Err(StoreError::Backend(format!(
                    "persist of workspace {:?} rejected",
                    self.workspace
                )));
            }
            store.files.insert(self.workspace.clone(), file.clone());
            store.persisted.push(self.workspace.clone());
        }

        info!(workspace = %self.workspace, serial = file.serial, "Persisted state");
        self.staged.persisted(&file);
        Ok(())
    }

    fn snapshot_meta(&self) -> Option<SnapshotMeta> {
        self.staged.meta()
    }

    fn state_for_migration(&self) -> Option<StateFile> {
        self.staged.export()
    }

    fn write_state_for_migration(&mut self, file: StateFile, force: bool) -> Result<()> {
        self.staged.adopt(file, force)
    }

    fn locker(&mut self) -> Option<&mut dyn Locker> {
        Some(self)
    }
}

#[async_trait]
impl Locker for MemoryStateManager {
    async fn lock(&mut self, info: &LockInfo) -> Result<String> {
        debug!(workspace = %self.workspace, operation = %info.operation, "MemoryStateManager::lock: called");
        let mut store = lock_store(&self.store)?;
        if let Some(holder) = store.locks.get(&self.workspace) {
            return Err(StoreError::Locked(Box::new(holder.clone())));
        }
        let info = info.at_path(format!("memory://{}", self.workspace));
        store.locks.insert(self.workspace.clone(), info.clone());
        Ok(info.id)
    }

    async fn unlock(&mut self, id: &str) -> Result<()> {
        debug!(workspace = %self.workspace, %id, "MemoryStateManager::unlock: called");
        let mut store = lock_store(&self.store)?;
        match store.locks.get(&self.workspace) {
            Some(holder) if holder.id == id => {
                store.locks.remove(&self.workspace);
                Ok(())
            }
            _ => Err(StoreError::LockNotHeld { id: id.to_string() }),
        }
    }
}
