//! Copying one workspace from the source backend to the destination backend

use statestore::{DEFAULT_WORKSPACE, StateManager, StateSnapshot, StoreError};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::export::TempExport;
use crate::messages;
use crate::options::MigrationOptions;
use crate::planner::StateMigrator;
use crate::ui::InputRequest;

/// What a single workspace copy ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The source workspace has no state; the destination was not opened for writing
    SourceEmpty,

    /// Both sides already hold the same state from the same lineage
    AlreadyInSync,

    /// After locking, there was nothing worth copying
    NothingToCopy,

    /// The operator chose to keep the destination as it was
    Declined,

    Copied,
}

/// What a copy would do, judged only by emptiness of each side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Nothing,
    IntoEmpty,
    Overwrite,
}

fn is_empty(state: Option<&StateSnapshot>) -> bool {
    state.is_none_or(StateSnapshot::is_empty)
}

impl Transfer {
    pub fn classify(source: Option<&StateSnapshot>, destination: Option<&StateSnapshot>) -> Self {
        match (is_empty(source), is_empty(destination)) {
            (true, _) => Self::Nothing,
            (false, true) => Self::IntoEmpty,
            (false, false) => Self::Overwrite,
        }
    }
}

/// Same content, and the same lineage whenever both sides track one
pub fn already_in_sync(source: &dyn StateManager, destination: &dyn StateManager) -> bool {
    let (Some(src), Some(dst)) = (source.state(), destination.state()) else {
        return false;
    };
    if src != dst {
        return false;
    }
    match (source.snapshot_meta(), destination.snapshot_meta()) {
        (Some(src_meta), Some(dst_meta)) => src_meta.lineage == dst_meta.lineage,
        _ => true,
    }
}

impl StateMigrator {
    /// Copy `opts.source_workspace` into `opts.destination_workspace`
    ///
    /// Only the destination is ever written. If the destination refuses the
    /// default workspace, a new name is asked for and recorded in `opts`; a
    /// selected workspace of `default` follows it.
    pub async fn copy_one(&self, opts: &mut MigrationOptions, selected: &mut String) -> Result<CopyOutcome> {
        debug!(source = %opts.source_workspace, destination = %opts.destination_workspace, force = opts.force, "StateMigrator::copy_one: called");
        info!(
            "Migrating workspace {:?} ({}) to {:?} ({})",
            opts.source_workspace,
            opts.source_type(),
            opts.destination_workspace,
            opts.destination_type()
        );
        if self.locks().cancel_token().is_cancelled() {
            return Err(MigrateError::Cancelled);
        }

        let mut source = opts
            .source()
            .state_manager(&opts.source_workspace)
            .await
            .map_err(|e| MigrateError::load(opts.source_type(), e))?;
        source
            .refresh_state()
            .await
            .map_err(|e| MigrateError::load(opts.source_type(), e))?;

        if is_empty(source.state()) {
            debug!(workspace = %opts.source_workspace, "StateMigrator::copy_one: source empty, skipping");
            return Ok(CopyOutcome::SourceEmpty);
        }

        let opened = opts.destination().state_manager(&opts.destination_workspace).await;
        let mut destination = match opened {
            Ok(manager) => manager,
            Err(StoreError::DefaultWorkspaceNotSupported) => {
                let name = self.prompt_new_workspace_name(opts)?;
                let manager = opts
                    .destination()
                    .state_manager(&name)
                    .await
                    .map_err(|e| MigrateError::load(opts.destination_type(), e))?;
                if selected.as_str() == DEFAULT_WORKSPACE {
                    *selected = name.clone();
                }
                opts.destination_workspace = name;
                manager
            }
            Err(e) => return Err(MigrateError::load(opts.destination_type(), e)),
        };
        destination
            .refresh_state()
            .await
            .map_err(|e| MigrateError::load(opts.destination_type(), e))?;

        if already_in_sync(source.as_ref(), destination.as_ref()) {
            info!(workspace = %opts.destination_workspace, "Source and destination already in sync");
            return Ok(CopyOutcome::AlreadyInSync);
        }

        let held = self.locks().lock_pair(source.as_mut(), destination.as_mut()).await?;
        let result = self.copy_locked(opts, source.as_mut(), destination.as_mut()).await;
        self.locks().release(held, source.as_mut(), destination.as_mut()).await;
        result
    }

    async fn copy_locked(
        &self,
        opts: &MigrationOptions,
        source: &mut dyn StateManager,
        destination: &mut dyn StateManager,
    ) -> Result<CopyOutcome> {
        debug!("StateMigrator::copy_locked: called");
        source
            .refresh_state()
            .await
            .map_err(|e| MigrateError::load(opts.source_type(), e))?;
        destination
            .refresh_state()
            .await
            .map_err(|e| MigrateError::load(opts.destination_type(), e))?;

        let transfer = Transfer::classify(source.state(), destination.state());
        debug!(?transfer, "StateMigrator::copy_locked: classified");
        if transfer == Transfer::Nothing {
            return Ok(CopyOutcome::NothingToCopy);
        }

        if !opts.force && !self.input_enabled() {
            return Err(MigrateError::Confirmation("input disabled".to_string()));
        }

        let proceed = opts.force
            || match transfer {
                Transfer::IntoEmpty => self.confirm_copy_to_empty(opts)?,
                _ => self.confirm_overwrite(opts, source, destination)?,
            };
        if !proceed {
            info!(workspace = %opts.destination_workspace, "Copy declined; destination left unchanged");
            return Ok(CopyOutcome::Declined);
        }

        statestore::migrate(destination, source)
            .map_err(|e| MigrateError::copy(opts.source_type(), opts.destination_type(), e))?;
        destination
            .persist_state()
            .await
            .map_err(|e| MigrateError::copy(opts.source_type(), opts.destination_type(), e))?;

        info!(workspace = %opts.destination_workspace, "Copied state");
        Ok(CopyOutcome::Copied)
    }

    fn confirm_copy_to_empty(&self, opts: &MigrationOptions) -> Result<bool> {
        let (id, description) = if opts.destination().is_managed() {
            (
                messages::ID_COPY_TO_EMPTY_MANAGED,
                messages::copy_to_empty_managed(opts.source_type()),
            )
        } else if opts.source().is_managed() {
            (
                messages::ID_COPY_MANAGED_TO_EMPTY,
                messages::copy_managed_to_empty(opts.destination_type()),
            )
        } else {
            (
                messages::ID_COPY_TO_EMPTY,
                messages::copy_to_empty(opts.source_type(), opts.destination_type()),
            )
        };
        self.gate().confirm(&InputRequest::new(
            id,
            messages::copy_query(opts.destination_type()),
            description,
        ))
    }

    fn confirm_overwrite(
        &self,
        opts: &MigrationOptions,
        source: &dyn StateManager,
        destination: &dyn StateManager,
    ) -> Result<bool> {
        let export = TempExport::write(source, opts.source_type(), destination, opts.destination_type())?;
        let source_path = export.source_path().display().to_string();
        let destination_path = export.destination_path().display().to_string();

        let (id, description) = if opts.destination().is_managed() {
            (
                messages::ID_TO_MANAGED,
                messages::overwrite_managed(opts.source_type(), &source_path, &destination_path),
            )
        } else {
            (
                messages::ID_TO_BACKEND,
                messages::overwrite(
                    opts.source_type(),
                    opts.destination_type(),
                    &source_path,
                    &destination_path,
                ),
            )
        };
        self.gate().confirm(&InputRequest::new(
            id,
            messages::copy_query(opts.destination_type()),
            description,
        ))
    }

    pub(crate) fn prompt_new_workspace_name(&self, opts: &MigrationOptions) -> Result<String> {
        let name = self.gate().ask(&InputRequest::new(
            messages::ID_NEW_STATE_NAME,
            messages::new_workspace_name_query(opts.destination_type(), opts.destination().is_managed()),
            messages::new_workspace_name(),
        ))?;
        if name.is_empty() {
            return Err(MigrateError::Confirmation("a workspace name is required".to_string()));
        }
        statestore::validate_workspace_name(&name).map_err(|e| MigrateError::Confirmation(e.to_string()))?;
        Ok(name)
    }
}
