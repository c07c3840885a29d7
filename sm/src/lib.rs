//! StateMigrate - interactive state migration between storage backends
//!
//! Moves workspace state from one [`statestore::Backend`] to another. The
//! engine looks at both sides' workspace topology, picks a strategy and copies
//! each workspace under a pair of locks, asking the operator before anything
//! in the destination is replaced.
//!
//! # Modules
//!
//! - [`planner`] - strategy selection and the multi-workspace flows
//! - [`copy`] - single-workspace copy under locks
//! - [`lock`] - two-lock coordination with a shared deadline
//! - [`rename`] - `prefix*suffix` workspace rename patterns
//! - [`ui`] - operator input and the terminal implementation
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod classify;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod copy;
pub mod error;
pub mod export;
pub mod lock;
pub mod messages;
pub mod options;
pub mod planner;
pub mod rename;
pub mod ui;
pub mod version;
pub mod workspace;

pub use classify::{Classification, classify};
pub use config::{Config, LockConfig};
pub use confirm::ConfirmationGate;
pub use copy::{CopyOutcome, Transfer};
pub use error::{LockFailure, MigrateError, Result};
pub use lock::{CancelToken, LockCoordinator, LockSettings};
pub use options::MigrationOptions;
pub use planner::{MigrationReport, StateMigrator, Strategy, WorkspaceOutcome};
pub use rename::RenamePattern;
pub use ui::{InputRequest, TerminalUi, UiError, UiInput};
pub use version::{Diagnostic, Severity, ToolVersionCheck, VersionCheck};
pub use workspace::WorkspaceStore;
