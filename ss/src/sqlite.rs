//! SQLite backend
//!
//! Every workspace is one row in `states`; locks are rows in `locks` guarded by
//! the workspace primary key, so a second insert for the same workspace fails.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::backend::{Backend, BackendSettings, Locker, StateManager, WorkspaceNaming};
use crate::error::{Result, StoreError};
use crate::lock::LockInfo;
use crate::snapshot::{SnapshotMeta, StateFile, StateSnapshot};
use crate::staged::Staged;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS states (
    workspace  TEXT PRIMARY KEY,
    lineage    TEXT NOT NULL,
    serial     INTEGER NOT NULL,
    body       TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS locks (
    workspace TEXT PRIMARY KEY,
    id        TEXT NOT NULL,
    info      TEXT NOT NULL
);
";

/// Shared connection handle
#[derive(Clone)]
struct Db(Arc<Mutex<Connection>>);

impl Db {
    fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .0
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection mutex poisoned".to_string()))?;
        f(&conn)
    }
}

/// Workspace state stored in a single SQLite database
#[derive(Clone)]
pub struct SqliteBackend {
    db: Db,
    path: PathBuf,
    settings: BackendSettings,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>, settings: BackendSettings) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), "SqliteBackend::open: called");
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(&path)?;
        Self::init(conn, path, settings)
    }

    /// Private in-memory database
    pub fn open_in_memory(settings: BackendSettings) -> Result<Self> {
        debug!("SqliteBackend::open_in_memory: called");
        Self::init(Connection::open_in_memory()?, PathBuf::from(":memory:"), settings)
    }

    fn init(conn: Connection, path: PathBuf, settings: BackendSettings) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Db(Arc::new(Mutex::new(conn))),
            path,
            settings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn backend_type(&self) -> &'static str {
        "sqlite"
    }

    async fn workspaces(&self) -> Result<Vec<String>> {
        debug!(path = %self.path.display(), "SqliteBackend::workspaces: called");
        let stored = self.db.with(|conn| {
            let mut stmt = conn.prepare("SELECT workspace FROM states ORDER BY workspace")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })?;
        self.settings.visible_workspaces(stored)
    }

    async fn state_manager(&self, workspace: &str) -> Result<Box<dyn StateManager>> {
        debug!(%workspace, "SqliteBackend::state_manager: called");
        self.settings.check_workspace(workspace)?;
        Ok(Box::new(SqliteStateManager {
            db: self.db.clone(),
            location: format!("{}#{}", self.path.display(), workspace),
            workspace: workspace.to_string(),
            staged: Staged::default(),
            lock_id: None,
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

/// State manager for one workspace row
pub struct SqliteStateManager {
    db: Db,
    location: String,
    workspace: String,
    staged: Staged,
    lock_id: Option<String>,
}

impl SqliteStateManager {
    fn read_row(&self) -> Result<Option<StateFile>> {
        let row = self.db.with(|conn| {
            let row = conn
                .query_row(
                    "SELECT lineage, serial, body FROM states WHERE workspace = ?1",
                    params![self.workspace],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row)
        })?;

        match row {
            Some((lineage, serial, body)) => {
                let state: StateSnapshot = serde_json::from_str(&body)?;
                let serial = u64::try_from(serial).map_err(|_| StoreError::SerialOutOfRange(serial.to_string()))?;
                let meta = SnapshotMeta { lineage, serial };
                Ok(Some(StateFile::new(state, meta)))
            }
            None => Ok(None),
        }
    }

    fn read_holder(&self) -> Result<LockInfo> {
        let info = self.db.with(|conn| {
            let info = conn
                .query_row(
                    "SELECT info FROM locks WHERE workspace = ?1",
                    params![self.workspace],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(info)
        })?;
        match info {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(LockInfo::new("unknown").at_path(self.location.clone())),
        }
    }
}

#[async_trait]
impl StateManager for SqliteStateManager {
    async fn refresh_state(&mut self) -> Result<()> {
        debug!(location = %self.location, "SqliteStateManager::refresh_state: called");
        let file = self.read_row()?;
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
        debug!(location = %self.location, "SqliteStateManager::persist_state: called");
        let Some(file) = self.staged.to_persist()? else {
            return Ok(());
        };

        // SQLite integers are signed 64-bit
        let serial = i64::try_from(file.serial).map_err(|_| StoreError::SerialOutOfRange(file.serial.to_string()))?;
        let body = serde_json::to_string(&file.state)?;
        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO states (workspace, lineage, serial, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(workspace) DO UPDATE SET
                     lineage = excluded.lineage,
                     serial = excluded.serial,
                     body = excluded.body,
                     updated_at = excluded.updated_at",
                params![
                    self.workspace,
                    file.lineage,
                    serial,
                    body,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })?;

        info!(location = %self.location, lineage = %file.lineage, serial = file.serial, "Persisted state");
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
impl Locker for SqliteStateManager {
    async fn lock(&mut self, info: &LockInfo) -> Result<String> {
        debug!(location = %self.location, operation = %info.operation, "SqliteStateManager::lock: called");
        let info = info.at_path(self.location.clone());
        let raw = serde_json::to_string(&info)?;

        let inserted = self.db.with(|conn| {
            match conn.execute(
                "INSERT INTO locks (workspace, id, info) VALUES (?1, ?2, ?3)",
                params![self.workspace, info.id, raw],
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => Ok(false),
                Err(e) => Err(e.into()),
            }
        })?;

        if !inserted {
            debug!("SqliteStateManager::lock: lock held elsewhere");
            return Err(StoreError::Locked(Box::new(self.read_holder()?)));
        }

        self.lock_id = Some(info.id.clone());
        Ok(info.id)
    }

    async fn unlock(&mut self, id: &str) -> Result<()> {
        debug!(location = %self.location, %id, "SqliteStateManager::unlock: called");
        let removed = self.db.with(|conn| {
            Ok(conn.execute(
                "DELETE FROM locks WHERE workspace = ?1 AND id = ?2",
                params![self.workspace, id],
            )?)
        })?;

        if removed == 0 {
            return Err(StoreError::LockNotHeld { id: id.to_string() });
        }
        if self.lock_id.as_deref() == Some(id) {
            self.lock_id = None;
        }
        Ok(())
    }
}
