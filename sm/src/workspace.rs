//! Selected-workspace persistence and the interactive selection prompt

use statestore::{DEFAULT_WORKSPACE, validate_workspace_name};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::confirm::ConfirmationGate;
use crate::error::{MigrateError, Result};
use crate::messages;
use crate::ui::InputRequest;

/// File under the data directory holding the selected workspace name
pub const SELECTION_FILE: &str = "workspace";

/// Remembers which workspace is selected between runs
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    path: PathBuf,
}

impl WorkspaceStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SELECTION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Selected workspace; `default` when nothing has been selected yet
    pub fn current(&self) -> Result<String> {
        debug!(path = %self.path.display(), "WorkspaceStore::current: called");
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let name = content.trim();
                if name.is_empty() {
                    return Ok(DEFAULT_WORKSPACE.to_string());
                }
                validate_workspace_name(name).map_err(|e| MigrateError::Selection(e.to_string()))?;
                Ok(name.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DEFAULT_WORKSPACE.to_string()),
            Err(e) => Err(MigrateError::Selection(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Persist `name` as the selected workspace
    pub fn select(&self, name: &str) -> Result<()> {
        debug!(%name, path = %self.path.display(), "WorkspaceStore::select: called");
        validate_workspace_name(name).map_err(|e| MigrateError::Selection(e.to_string()))?;

        let write = || -> std::io::Result<()> {
            let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
            fs::create_dir_all(dir)?;
            let mut staged = tempfile::NamedTempFile::new_in(dir)?;
            writeln!(staged, "{}", name)?;
            staged.persist(&self.path).map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(|e| MigrateError::Selection(format!("failed to write {}: {}", self.path.display(), e)))?;

        info!(%name, "Selected workspace");
        Ok(())
    }
}

/// Ask which of `workspaces` to select
///
/// Returns `None` when there is nothing to choose from; a single workspace is
/// chosen without asking.
pub fn prompt_selection(gate: &ConfirmationGate<'_>, workspaces: &[String]) -> Result<Option<String>> {
    debug!(count = workspaces.len(), "prompt_selection: called");
    match workspaces {
        [] => {
            warn!("No workspaces in the destination to select");
            Ok(None)
        }
        [only] => Ok(Some(only.clone())),
        _ => {
            let listing: String = workspaces
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{}. {}\n", i + 1, name))
                .collect();
            let answer = gate.ask(&InputRequest::new(
                messages::ID_SELECT_WORKSPACE,
                "Select a workspace",
                messages::select_workspace(&listing),
            ))?;
            let index: usize = answer
                .parse()
                .map_err(|_| MigrateError::Selection(format!("{answer:?} is not a number")))?;
            index
                .checked_sub(1)
                .and_then(|i| workspaces.get(i))
                .cloned()
                .map(Some)
                .ok_or_else(|| {
                    MigrateError::Selection(format!("{index} is not between 1 and {}", workspaces.len()))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::mock::ScriptedUi;
    use tempfile::tempdir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_current_defaults_when_missing() {
        let temp = tempdir().unwrap();
        let store = WorkspaceStore::new(temp.path());
        assert_eq!(store.current().unwrap(), DEFAULT_WORKSPACE);
    }

    #[test]
    fn test_select_then_current() {
        let temp = tempdir().unwrap();
        let store = WorkspaceStore::new(temp.path().join("nested"));
        store.select("app-prod").unwrap();
        assert_eq!(store.current().unwrap(), "app-prod");
        assert_eq!(WorkspaceStore::new(temp.path().join("nested")).current().unwrap(), "app-prod");
    }

    #[test]
    fn test_select_rejects_invalid_name() {
        let temp = tempdir().unwrap();
        let store = WorkspaceStore::new(temp.path());
        assert!(matches!(store.select("../escape"), Err(MigrateError::Selection(_))));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_prompt_picks_numbered_entry() {
        let ui = ScriptedUi::new(["2"]);
        let gate = ConfirmationGate::new(&ui, true);
        let choice = prompt_selection(&gate, &names(&["a", "b", "c"])).unwrap();
        assert_eq!(choice.as_deref(), Some("b"));
        assert_eq!(ui.asked_ids(), vec![messages::ID_SELECT_WORKSPACE]);
    }

    #[test]
    fn test_prompt_rejects_out_of_range() {
        let ui = ScriptedUi::new(["0"]);
        let gate = ConfirmationGate::new(&ui, true);
        assert!(matches!(
            prompt_selection(&gate, &names(&["a", "b"])),
            Err(MigrateError::Selection(_))
        ));
    }

    #[test]
    fn test_prompt_single_and_empty_need_no_input() {
        let ui = ScriptedUi::new(Vec::<String>::new());
        let gate = ConfirmationGate::new(&ui, false);
        assert_eq!(prompt_selection(&gate, &names(&["only"])).unwrap().as_deref(), Some("only"));
        assert_eq!(prompt_selection(&gate, &[]).unwrap(), None);
    }
}
