//! StateStore - workspace state snapshots and pluggable storage backends
//!
//! A backend stores one or more named *workspaces*, each holding a single
//! state snapshot with lineage/serial bookkeeping. The migration engine only
//! sees the [`Backend`], [`StateManager`] and [`Locker`] traits; the concrete
//! backends here exist so that the traits can be exercised end to end.
//!
//! # Layout of the filesystem backend
//!
//! ```text
//! <root>/
//! ├── state.json              # default workspace
//! ├── state.json.lock
//! └── workspaces.d/
//!     └── {name}/
//!         ├── state.json
//!         └── state.json.lock
//! ```
//!
//! # Example
//!
//! ```ignore
//! use statestore::{Backend, FsBackend, BackendSettings};
//!
//! let backend = FsBackend::open("./state", BackendSettings::default())?;
//! let mut mgr = backend.state_manager("default").await?;
//! mgr.refresh_state().await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod name;
pub mod snapshot;
pub mod sqlite;
mod staged;

pub use backend::{Backend, BackendSettings, Locker, StateManager, WorkspaceNaming, migrate};
pub use config::BackendConfig;
pub use error::{Result, StoreError};
pub use fs::FsBackend;
pub use lock::LockInfo;
pub use memory::MemoryBackend;
pub use name::validate_workspace_name;
pub use snapshot::{SnapshotMeta, StateFile, StateSnapshot};
pub use sqlite::SqliteBackend;

/// Name of the implicit workspace every single-state backend uses
pub const DEFAULT_WORKSPACE: &str = "default";

/// Version of the running tool, recorded in state files and lock info
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
