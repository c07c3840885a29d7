//! Strategy selection and the multi-workspace migration flows

use statestore::{DEFAULT_WORKSPACE, WorkspaceNaming};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::classify::classify;
use crate::confirm::ConfirmationGate;
use crate::copy::CopyOutcome;
use crate::error::{MigrateError, Result};
use crate::lock::{CancelToken, LockCoordinator, LockSettings};
use crate::messages;
use crate::options::MigrationOptions;
use crate::rename::RenamePattern;
use crate::ui::{InputRequest, UiInput};
use crate::version::{ToolVersionCheck, VersionCheck};
use crate::workspace::prompt_selection;

/// Attempts at entering a valid rename pattern
const PATTERN_ATTEMPTS: usize = 3;

/// How workspaces move between the two backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One workspace copied into one destination workspace
    DirectCopy,

    /// The selected workspace of a multi-workspace source into a single-state destination
    MultiToSingle,

    /// Every source workspace into the destination under the same name
    MultiToMulti,

    /// Every source workspace into the destination under a pattern-derived name
    MultiToMultiRenamed,
}

impl Strategy {
    pub fn select(source_single: bool, destination_single: bool, destination_naming: &WorkspaceNaming) -> Self {
        match (source_single, destination_single) {
            (true, _) => Self::DirectCopy,
            (false, true) => Self::MultiToSingle,
            (false, false) if *destination_naming == WorkspaceNaming::GloballyUnique => Self::MultiToMultiRenamed,
            (false, false) => Self::MultiToMulti,
        }
    }
}

/// Result of copying one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceOutcome {
    pub source: String,
    pub destination: String,
    pub outcome: CopyOutcome,
}

/// Summary of a completed migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub strategy: Strategy,
    pub outcomes: Vec<WorkspaceOutcome>,

    /// Workspace that should be selected once the destination is in use
    pub selected_workspace: String,
}

impl MigrationReport {
    /// Number of workspaces whose state was actually written
    pub fn copied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome == CopyOutcome::Copied).count()
    }
}

/// Moves state between two backends
pub struct StateMigrator {
    ui: Arc<dyn UiInput>,
    input: bool,
    locks: LockCoordinator,
    version_check: Arc<dyn VersionCheck>,
    ignore_remote_version: bool,
}

impl StateMigrator {
    pub fn new(ui: Arc<dyn UiInput>) -> Self {
        Self {
            ui,
            input: true,
            locks: LockCoordinator::default(),
            version_check: Arc::new(ToolVersionCheck::default()),
            ignore_remote_version: false,
        }
    }

    /// Whether questions may be asked at all
    pub fn with_input(mut self, input: bool) -> Self {
        self.input = input;
        self
    }

    pub fn with_locks(mut self, settings: LockSettings) -> Self {
        self.locks = LockCoordinator::new(settings, self.locks.cancel_token());
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.locks = LockCoordinator::new(self.locks.settings().clone(), cancel);
        self
    }

    pub fn with_version_check(mut self, check: Arc<dyn VersionCheck>) -> Self {
        self.version_check = check;
        self
    }

    pub fn ignore_remote_version(mut self, ignore: bool) -> Self {
        self.ignore_remote_version = ignore;
        self
    }

    pub(crate) fn input_enabled(&self) -> bool {
        self.input
    }

    pub(crate) fn locks(&self) -> &LockCoordinator {
        &self.locks
    }

    pub(crate) fn gate(&self) -> ConfirmationGate<'_> {
        ConfirmationGate::new(self.ui.as_ref(), self.input)
    }

    /// Migrate according to the topology of both backends
    ///
    /// `selected` is the currently selected workspace. It is updated when the
    /// migration implies a different selection and is also returned in the report.
    pub async fn migrate(&self, opts: &mut MigrationOptions, selected: &mut String) -> Result<MigrationReport> {
        debug!(?opts, %selected, "StateMigrator::migrate: called");
        info!(
            "Migrating state from the {:?} backend to the {:?} backend",
            opts.source_type(),
            opts.destination_type()
        );

        let source = classify(opts.source(), opts.source_type()).await?;
        let destination = classify(opts.destination(), opts.destination_type()).await?;
        let mut source_single = source.single_state;
        let mut destination_single = destination.single_state;

        opts.source_workspace = selected.clone();
        opts.destination_workspace = DEFAULT_WORKSPACE.to_string();

        if matches!(opts.source().naming(), WorkspaceNaming::Fixed { .. }) {
            source_single = true;
        }
        let destination_naming = opts.destination().naming();
        if let WorkspaceNaming::Fixed { name } = &destination_naming {
            destination_single = true;
            opts.destination_workspace = name.clone();
        }

        if let [only] = source.workspaces.as_slice() {
            debug!(workspace = %only, "StateMigrator::migrate: source has one workspace, treating as single-state");
            source_single = true;
            opts.source_workspace = only.clone();
            if !destination_single {
                opts.destination_workspace = only.clone();
            }
        }

        self.check_remote_versions(opts, &destination.workspaces, &destination_naming)
            .await?;

        let strategy = Strategy::select(source_single, destination_single, &destination_naming);
        info!(?strategy, "Selected migration strategy");

        let outcomes = match strategy {
            Strategy::DirectCopy => self.direct_copy(opts, selected).await?,
            Strategy::MultiToSingle => self.multi_to_single(opts, selected).await?,
            Strategy::MultiToMulti => self.multi_to_multi(opts, selected).await?,
            Strategy::MultiToMultiRenamed => {
                self.multi_to_renamed(opts, selected, source.workspaces.clone())
                    .await?
            }
        };

        Ok(MigrationReport {
            strategy,
            outcomes,
            selected_workspace: selected.clone(),
        })
    }

    async fn check_remote_versions(
        &self,
        opts: &MigrationOptions,
        destination_workspaces: &[String],
        destination_naming: &WorkspaceNaming,
    ) -> Result<()> {
        if self.ignore_remote_version {
            debug!("StateMigrator::check_remote_versions: ignoring remote versions");
            return Ok(());
        }

        let mut targets = destination_workspaces.to_vec();
        if targets.is_empty() && *destination_naming == WorkspaceNaming::Free {
            targets.push(DEFAULT_WORKSPACE.to_string());
        }

        for workspace in targets {
            let diagnostics = self.version_check.check(opts.destination(), &workspace).await;
            if let Some(diag) = diagnostics.iter().find(|d| d.is_error()) {
                return Err(MigrateError::VersionCompatibility {
                    backend: opts.destination_type().to_string(),
                    workspace,
                    detail: format!("{}: {}", diag.summary, diag.detail),
                });
            }
            for diag in diagnostics {
                tracing::warn!(%workspace, summary = %diag.summary, "{}", diag.detail);
            }
        }
        Ok(())
    }

    async fn copy_recorded(&self, opts: &mut MigrationOptions, selected: &mut String) -> Result<WorkspaceOutcome> {
        let outcome = self.copy_one(opts, selected).await?;
        Ok(WorkspaceOutcome {
            source: opts.source_workspace.clone(),
            destination: opts.destination_workspace.clone(),
            outcome,
        })
    }

    async fn direct_copy(&self, opts: &mut MigrationOptions, selected: &mut String) -> Result<Vec<WorkspaceOutcome>> {
        debug!("StateMigrator::direct_copy: called");
        Ok(vec![self.copy_recorded(opts, selected).await?])
    }

    async fn multi_to_single(
        &self,
        opts: &mut MigrationOptions,
        selected: &mut String,
    ) -> Result<Vec<WorkspaceOutcome>> {
        debug!("StateMigrator::multi_to_single: called");
        if !opts.force {
            let description = if opts.destination().is_managed() {
                messages::multi_to_managed_single(opts.source_type(), &opts.destination_workspace)
            } else if opts.source().is_managed() {
                messages::managed_multi_to_single(opts.destination_type(), &opts.source_workspace)
            } else {
                messages::multi_to_single(opts.source_type(), opts.destination_type(), &opts.source_workspace)
            };
            let request = InputRequest::new(
                messages::ID_MULTI_TO_SINGLE,
                messages::multi_to_single_query(),
                description,
            );
            if !self.gate().confirm(&request)? {
                return Err(MigrateError::Aborted);
            }
        }

        *selected = opts.destination_workspace.clone();
        Ok(vec![self.copy_recorded(opts, selected).await?])
    }

    async fn multi_to_multi(&self, opts: &mut MigrationOptions, selected: &mut String) -> Result<Vec<WorkspaceOutcome>> {
        debug!("StateMigrator::multi_to_multi: called");
        if !opts.force {
            let description = if opts.source().is_managed() {
                messages::managed_multi_to_multi(opts.destination_type())
            } else {
                messages::multi_to_multi(opts.source_type(), opts.destination_type())
            };
            let request = InputRequest::new(
                messages::ID_MULTI_TO_MULTI,
                messages::multi_to_multi_query(opts.destination_type()),
                description,
            );
            if !self.gate().confirm(&request)? {
                return Err(MigrateError::Aborted);
            }
        }

        let mut workspaces = opts
            .source()
            .workspaces()
            .await
            .map_err(|e| MigrateError::load(opts.source_type(), e))?;
        workspaces.sort();

        let mut outcomes = Vec::with_capacity(workspaces.len());
        for name in workspaces {
            opts.source_workspace = name.clone();
            opts.destination_workspace = name.clone();
            opts.force = true;
            match self.copy_recorded(opts, selected).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => return Err(partial(opts, &name, e)),
            }
        }
        Ok(outcomes)
    }

    async fn multi_to_renamed(
        &self,
        opts: &mut MigrationOptions,
        selected: &mut String,
        mut workspaces: Vec<String>,
    ) -> Result<Vec<WorkspaceOutcome>> {
        debug!("StateMigrator::multi_to_renamed: called");
        workspaces.sort();
        let current = selected.clone();

        let replacements = self.default_replacement(opts, &workspaces).await?;
        let bases: Vec<String> = workspaces
            .iter()
            .map(|name| replacements.get(name).unwrap_or(name).clone())
            .collect();
        let pattern = self.rename_pattern(opts, &bases)?;
        info!(%pattern, "Renaming workspaces with pattern");

        let mut renamed_current = None;
        let mut outcomes = Vec::with_capacity(workspaces.len());
        for (name, base) in workspaces.into_iter().zip(&bases) {
            opts.source_workspace = name.clone();
            opts.destination_workspace = pattern.apply(base);
            opts.force = true;
            match self.copy_recorded(opts, selected).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => return Err(partial(opts, &name, e)),
            }
            if name == current {
                renamed_current = Some(opts.destination_workspace.clone());
            }
        }

        let available = opts
            .destination()
            .workspaces()
            .await
            .map_err(|e| MigrateError::load(opts.destination_type(), e))?;

        match renamed_current {
            Some(renamed) if available.contains(&renamed) => {
                *selected = renamed;
                self.ui.output(messages::MIGRATION_COMPLETE);
                self.ui.output(&messages::workspace_listing(&available, selected));
            }
            _ => {
                if let Some(choice) = prompt_selection(&self.gate(), &available)? {
                    *selected = choice;
                }
            }
        }
        Ok(outcomes)
    }

    /// Name to migrate the source's non-empty default workspace under
    async fn default_replacement(
        &self,
        opts: &MigrationOptions,
        workspaces: &[String],
    ) -> Result<HashMap<String, String>> {
        let mut replacements = HashMap::new();
        if !workspaces.iter().any(|w| w == DEFAULT_WORKSPACE) {
            return Ok(replacements);
        }

        let mut manager = opts
            .source()
            .state_manager(DEFAULT_WORKSPACE)
            .await
            .map_err(|e| MigrateError::load(opts.source_type(), e))?;
        manager
            .refresh_state()
            .await
            .map_err(|e| MigrateError::load(opts.source_type(), e))?;

        if manager.state().is_some_and(|s| !s.is_empty()) {
            let name = self.prompt_new_workspace_name(opts)?;
            debug!(%name, "StateMigrator::default_replacement: default workspace renamed");
            replacements.insert(DEFAULT_WORKSPACE.to_string(), name);
        }
        Ok(replacements)
    }

    /// Pattern to rename `bases` with; every renamed result is a valid workspace name
    fn rename_pattern(&self, opts: &MigrationOptions, bases: &[String]) -> Result<RenamePattern> {
        if let Some(existing) = opts.source().workspace_name_pattern() {
            debug!(%existing, "StateMigrator::rename_pattern: source already uses a pattern");
            if !opts.force {
                let request = InputRequest::new(
                    messages::ID_PREFIX_TO_UNIQUE,
                    "Do you wish to proceed?",
                    messages::prefix_to_unique(),
                );
                if !self.gate().confirm(&request)? {
                    return Err(MigrateError::Aborted);
                }
            }
            let pattern = RenamePattern::parse(&existing)?;
            check_renamed(&pattern, bases)?;
            return Ok(pattern);
        }

        let choice = self.gate().ask(&InputRequest::new(
            messages::ID_MULTI_TO_UNIQUE,
            messages::rename_choice_query(),
            messages::rename_choice(opts.source_type()),
        ))?;
        match choice.as_str() {
            "1" => {}
            "2" => {
                let pattern = RenamePattern::identity();
                check_renamed(&pattern, bases)?;
                return Ok(pattern);
            }
            _ => {
                return Err(MigrateError::Confirmation(
                    "please select 1 or 2 as part of this option".to_string(),
                ));
            }
        }

        let request = InputRequest::new(
            messages::ID_MULTI_TO_UNIQUE_PATTERN,
            messages::rename_pattern_query(),
            messages::rename_pattern(),
        );
        let mut attempt = 1;
        loop {
            let answer = self.gate().ask(&request)?;
            let parsed = RenamePattern::parse(&answer).and_then(|pattern| {
                check_renamed(&pattern, bases)?;
                Ok(pattern)
            });
            match parsed {
                Ok(pattern) => return Ok(pattern),
                Err(e) if attempt < PATTERN_ATTEMPTS => {
                    self.ui.output(&e.to_string());
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn check_renamed(pattern: &RenamePattern, bases: &[String]) -> Result<()> {
    for base in bases {
        statestore::validate_workspace_name(&pattern.apply(base))
            .map_err(|e| MigrateError::PatternValidation(e.to_string()))?;
    }
    Ok(())
}

fn partial(opts: &MigrationOptions, workspace: &str, err: MigrateError) -> MigrateError {
    MigrateError::PartialMigration {
        workspace: workspace.to_string(),
        source_type: opts.source_type().to_string(),
        destination_type: opts.destination_type().to_string(),
        source: Box::new(err),
    }
}
