//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// StateMigrate - move workspace state between storage backends
#[derive(Parser)]
#[command(
    name = "sm",
    about = "Interactive state migration between storage backends",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy state from the configured source backend to the destination backend
    Migrate {
        /// Skip confirmations and overwrite the destination
        #[arg(long)]
        force_copy: bool,

        /// Do not take state locks
        #[arg(long)]
        no_lock: bool,

        /// How long to keep retrying a held lock, in milliseconds
        #[arg(long, value_name = "MS")]
        lock_timeout_ms: Option<u64>,

        /// Fail instead of asking questions
        #[arg(long)]
        no_input: bool,

        /// Skip the destination's tool version check
        #[arg(long)]
        ignore_remote_version: bool,
    },

    /// Inspect and change the selected workspace
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommand,
    },
}

/// Workspace subcommands
#[derive(Debug, Subcommand)]
pub enum WorkspaceCommand {
    /// List workspaces, marking the selected one
    List {
        /// List the destination backend instead of the source
        #[arg(short, long)]
        destination: bool,
    },

    /// Print the selected workspace
    Show,

    /// Select a workspace
    Select {
        /// Workspace name
        name: String,

        /// Require the workspace to exist in the destination instead of the source
        #[arg(short, long)]
        destination: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate_flags() {
        let cli = Cli::try_parse_from([
            "sm",
            "-l",
            "debug",
            "migrate",
            "--force-copy",
            "--no-lock",
            "--lock-timeout-ms",
            "1500",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Migrate {
                force_copy,
                no_lock,
                lock_timeout_ms,
                no_input,
                ignore_remote_version,
            } => {
                assert!(force_copy);
                assert!(no_lock);
                assert_eq!(lock_timeout_ms, Some(1500));
                assert!(!no_input);
                assert!(!ignore_remote_version);
            }
            other => panic!("expected Migrate, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_workspace_select_with_global_config() {
        let cli = Cli::try_parse_from(["sm", "workspace", "select", "prod", "--destination", "-c", "sm.yml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("sm.yml")));
        match cli.command {
            Command::Workspace {
                command: WorkspaceCommand::Select { name, destination },
            } => {
                assert_eq!(name, "prod");
                assert!(destination);
            }
            other => panic!("expected workspace select, got {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["sm"]).is_err());
    }
}
