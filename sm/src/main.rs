//! StateMigrate - move workspace state between storage backends
//!
//! CLI entry point.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use statemigrate::cli::{Cli, Command, WorkspaceCommand};
use statemigrate::config::{Config, resolve_data_dir};
use statemigrate::{
    CancelToken, CopyOutcome, MigrateError, MigrationOptions, MigrationReport, StateMigrator, TerminalUi,
    WorkspaceStore,
};
use statestore::{Backend, BackendConfig, DEFAULT_WORKSPACE, StoreError};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, data_dir: &Path) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = data_dir.join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("sm.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level and data dir are needed before the full config load
    let (config_log_level, config_data_dir) = Config::load_early(cli.config.as_ref());
    let data_dir = resolve_data_dir(config_data_dir.as_deref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref(), &data_dir)
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Migrate {
            force_copy,
            no_lock,
            lock_timeout_ms,
            no_input,
            ignore_remote_version,
        } => {
            debug!(force_copy, no_lock, ?lock_timeout_ms, no_input, ignore_remote_version, "main: matched Migrate command");
            let flags = MigrateFlags {
                force_copy,
                no_lock,
                lock_timeout_ms,
                no_input,
                ignore_remote_version,
            };
            cmd_migrate(&config, flags).await
        }
        Command::Workspace { command } => {
            debug!("main: matched Workspace command");
            match command {
                WorkspaceCommand::List { destination } => {
                    debug!(destination, "main: matched WorkspaceCommand::List");
                    cmd_workspace_list(&config, destination).await
                }
                WorkspaceCommand::Show => {
                    debug!("main: matched WorkspaceCommand::Show");
                    cmd_workspace_show(&config)
                }
                WorkspaceCommand::Select { name, destination } => {
                    debug!(%name, destination, "main: matched WorkspaceCommand::Select");
                    cmd_workspace_select(&config, &name, destination).await
                }
            }
        }
    }
}

/// Command-line overrides for a migration
#[derive(Debug)]
struct MigrateFlags {
    force_copy: bool,
    no_lock: bool,
    lock_timeout_ms: Option<u64>,
    no_input: bool,
    ignore_remote_version: bool,
}

fn open_backend(config: Option<&BackendConfig>, role: &str) -> Result<Arc<dyn Backend>> {
    debug!(%role, "open_backend: called");
    let config = config.ok_or_else(|| eyre!("No {} backend configured", role))?;
    let backend = config
        .open()
        .context(format!("Failed to open {} backend ({})", role, config.type_tag()))?;
    Ok(Arc::from(backend))
}

/// Migrate state from the source backend to the destination backend
async fn cmd_migrate(config: &Config, flags: MigrateFlags) -> Result<()> {
    debug!(?flags, "cmd_migrate: called");
    let source = open_backend(config.source.as_ref(), "source")?;
    let destination = open_backend(config.destination.as_ref(), "destination")?;

    let mut locks = config.lock.settings();
    if flags.no_lock {
        locks.enabled = false;
    }
    if let Some(ms) = flags.lock_timeout_ms {
        locks.timeout = std::time::Duration::from_millis(ms);
    }

    let cancel = CancelToken::new();

    let store = WorkspaceStore::new(config.data_dir());
    let mut selected = store.current().context("Failed to read the selected workspace")?;

    let migrator = StateMigrator::new(Arc::new(TerminalUi::new()))
        .with_input(config.input && !flags.no_input)
        .with_locks(locks)
        .with_cancel(cancel.clone())
        .ignore_remote_version(config.ignore_remote_version || flags.ignore_remote_version);
    let mut opts = MigrationOptions::new(source, destination).force(config.force_copy || flags.force_copy);

    let result = tokio::select! {
        result = migrator.migrate(&mut opts, &mut selected) => result,
        _ = wait_for_second_interrupt(cancel) => {
            warn!("cmd_migrate: second interrupt, exiting");
            eprintln!("{}", "Migration interrupted.".red());
            std::process::exit(130);
        }
    };

    let report = match result {
        Ok(report) => report,
        Err(MigrateError::Aborted) => {
            println!("{}", "Migration aborted.".yellow());
            return Err(eyre!("Migration aborted by operator"));
        }
        Err(e) => {
            if let Some(workspace) = e.failed_workspace() {
                warn!(%workspace, "cmd_migrate: migration stopped part way");
            }
            eprintln!("{}", e.format_detailed().red());
            return Err(eyre!("Migration failed"));
        }
    };

    store
        .select(&report.selected_workspace)
        .context("Failed to save the selected workspace")?;
    print_report(&report);
    Ok(())
}

/// The first Ctrl-C cancels the migration at its next lock wait or workspace;
/// this resolves on the second one.
async fn wait_for_second_interrupt(cancel: CancelToken) {
    for count in 1..=2 {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "wait_for_second_interrupt: cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        if count == 1 {
            warn!("Interrupt received, cancelling");
            eprintln!(
                "{}",
                "Interrupt received; stopping before the next workspace. Press Ctrl-C again to exit now.".yellow()
            );
            cancel.cancel();
        }
    }
}

fn print_report(report: &MigrationReport) {
    println!("{} ({:?})", "Migration complete".green().bold(), report.strategy);
    for outcome in &report.outcomes {
        let label = match outcome.outcome {
            CopyOutcome::Copied => "copied".green(),
            CopyOutcome::AlreadyInSync => "already in sync".normal(),
            CopyOutcome::SourceEmpty | CopyOutcome::NothingToCopy => "nothing to copy".dimmed(),
            CopyOutcome::Declined => "kept existing".yellow(),
        };
        println!("  {} -> {}: {}", outcome.source, outcome.destination, label);
    }
    println!("Selected workspace: {}", report.selected_workspace.bold());
}

/// Workspaces a backend reports; single-state backends report only `default`
async fn list_workspaces(backend: &dyn Backend) -> Result<Vec<String>> {
    match backend.workspaces().await {
        Ok(workspaces) => Ok(workspaces),
        Err(StoreError::WorkspacesNotSupported) => Ok(vec![DEFAULT_WORKSPACE.to_string()]),
        Err(e) => Err(e).context(format!("Failed to list {} workspaces", backend.backend_type())),
    }
}

fn backend_for(config: &Config, destination: bool) -> Result<Arc<dyn Backend>> {
    if destination {
        open_backend(config.destination.as_ref(), "destination")
    } else {
        open_backend(config.source.as_ref(), "source")
    }
}

/// List workspaces, marking the selected one
async fn cmd_workspace_list(config: &Config, destination: bool) -> Result<()> {
    debug!(destination, "cmd_workspace_list: called");
    let backend = backend_for(config, destination)?;
    let selected = WorkspaceStore::new(config.data_dir())
        .current()
        .context("Failed to read the selected workspace")?;

    for name in list_workspaces(backend.as_ref()).await? {
        if name == selected {
            println!("* {}", name.green());
        } else {
            println!("  {}", name);
        }
    }
    Ok(())
}

/// Print the selected workspace
fn cmd_workspace_show(config: &Config) -> Result<()> {
    debug!("cmd_workspace_show: called");
    let selected = WorkspaceStore::new(config.data_dir())
        .current()
        .context("Failed to read the selected workspace")?;
    println!("{}", selected);
    Ok(())
}

/// Select a workspace that exists in the source (or destination) backend
async fn cmd_workspace_select(config: &Config, name: &str, destination: bool) -> Result<()> {
    debug!(%name, destination, "cmd_workspace_select: called");
    let backend = backend_for(config, destination)?;
    let available = list_workspaces(backend.as_ref()).await?;
    if !available.iter().any(|w| w == name) {
        return Err(eyre!(
            "Workspace {:?} does not exist in the {} backend",
            name,
            backend.backend_type()
        ));
    }

    WorkspaceStore::new(config.data_dir())
        .select(name)
        .context("Failed to save the selected workspace")?;
    println!("Switched to workspace {}", name.bold());
    Ok(())
}
