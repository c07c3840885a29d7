//! Filesystem backend
//!
//! The default workspace lives in `<root>/state.json`; named workspaces live in
//! `<root>/workspaces.d/<name>/state.json`. Locks are `fs2` exclusive locks on a
//! sibling `.lock` file that also records the holder's [`LockInfo`].

use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::DEFAULT_WORKSPACE;
use crate::backend::{Backend, BackendSettings, Locker, StateManager, WorkspaceNaming};
use crate::error::{Result, StoreError};
use crate::lock::LockInfo;
use crate::name::validate_workspace_name;
use crate::snapshot::{SnapshotMeta, StateFile, StateSnapshot};
use crate::staged::Staged;

/// File holding a workspace's state
pub const STATE_FILE: &str = "state.json";

/// Directory holding named workspaces
pub const WORKSPACES_DIR: &str = "workspaces.d";

/// Workspace state stored as JSON files under a root directory
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
    settings: BackendSettings,
}

impl FsBackend {
    /// Open (creating if needed) a filesystem backend rooted at `root`
    pub fn open(root: impl AsRef<Path>, settings: BackendSettings) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        debug!(root = %root.display(), "FsBackend::open: called");
        fs::create_dir_all(&root)?;
        Ok(Self { root, settings })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the state file for `workspace`
    pub fn state_path(&self, workspace: &str) -> PathBuf {
        if workspace == DEFAULT_WORKSPACE {
            self.root.join(STATE_FILE)
        } else {
            self.root.join(WORKSPACES_DIR).join(workspace).join(STATE_FILE)
        }
    }

    fn stored_workspaces(&self) -> Result<Vec<String>> {
        let dir = self.root.join(WORKSPACES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().is_dir()
                && let Some(name) = entry.file_name().to_str()
                && validate_workspace_name(name).is_ok()
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl Backend for FsBackend {
    fn backend_type(&self) -> &'static str {
        "local"
    }

    async fn workspaces(&self) -> Result<Vec<String>> {
        debug!(root = %self.root.display(), "FsBackend::workspaces: called");
        let stored = self.stored_workspaces()?;
        self.settings.visible_workspaces(stored)
    }

    async fn state_manager(&self, workspace: &str) -> Result<Box<dyn StateManager>> {
        debug!(%workspace, "FsBackend::state_manager: called");
        self.settings.check_workspace(workspace)?;
        Ok(Box::new(FsStateManager::new(self.state_path(workspace))))
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

#[derive(Debug)]
struct HeldLock {
    id: String,
    file: File,
}

/// State manager for one workspace file
#[derive(Debug)]
pub struct FsStateManager {
    path: PathBuf,
    lock_path: PathBuf,
    staged: Staged,
    lock: Option<HeldLock>,
}

impl FsStateManager {
    pub fn new(path: PathBuf) -> Self {
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            staged: Staged::default(),
            lock: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_holder(&self) -> LockInfo {
        fs::read(&self.lock_path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<LockInfo>(&bytes).ok())
            .unwrap_or_else(|| LockInfo::new("unknown").at_path(self.path.display().to_string()))
    }
}

#[async_trait]
impl StateManager for FsStateManager {
    async fn refresh_state(&mut self) -> Result<()> {
        debug!(path = %self.path.display(), "FsStateManager::refresh_state: called");
        self.staged.load(StateFile::read(&self.path)?);
        Ok(())
    }

    fn state(&self) -> Option<&StateSnapshot> {
        self.staged.state()
    }

    fn write_state(&mut self, state: StateSnapshot) -> Result<()> {
        debug!(path = %self.path.display(), "FsStateManager::write_state: called");
        self.staged.write(state);
        Ok(())
    }

    async fn persist_state(&mut self) -> Result<()> {
        debug!(path = %self.path.display(), "FsStateManager::persist_state: called");
        let Some(file) = self.staged.to_persist()? else {
            debug!("FsStateManager::persist_state: nothing staged");
            return Ok(());
        };

        file.write_atomic(&self.path)?;
        info!(path = %self.path.display(), lineage = %file.lineage, serial = file.serial, "Persisted state");
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
        debug!(path = %self.path.display(), force, "FsStateManager::write_state_for_migration: called");
        self.staged.adopt(file, force)
    }

    fn locker(&mut self) -> Option<&mut dyn Locker> {
        Some(self)
    }
}

#[async_trait]
impl Locker for FsStateManager {
    async fn lock(&mut self, info: &LockInfo) -> Result<String> {
        debug!(lock_path = %self.lock_path.display(), operation = %info.operation, "FsStateManager::lock: called");
        if self.lock.is_some() {
            return Err(StoreError::Locked(Box::new(self.read_holder())));
        }

        if let Some(dir) = self.lock_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;

        if let Err(e) = FileExt::try_lock_exclusive(&file) {
            if e.kind() == fs2::lock_contended_error().kind() {
                debug!("FsStateManager::lock: lock held elsewhere");
                return Err(StoreError::Locked(Box::new(self.read_holder())));
            }
            return Err(e.into());
        }

        let info = info.at_path(self.path.display().to_string());
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&serde_json::to_vec_pretty(&info)?)?;
        file.sync_all()?;

        self.lock = Some(HeldLock {
            id: info.id.clone(),
            file,
        });
        Ok(info.id)
    }

    async fn unlock(&mut self, id: &str) -> Result<()> {
        debug!(%id, "FsStateManager::unlock: called");
        match self.lock.take() {
            Some(held) if held.id == id => {
                held.file.set_len(0)?;
                FileExt::unlock(&held.file)?;
                Ok(())
            }
            Some(held) => {
                self.lock = Some(held);
                Err(StoreError::LockNotHeld { id: id.to_string() })
            }
            None => Err(StoreError::LockNotHeld { id: id.to_string() }),
        }
    }
}
