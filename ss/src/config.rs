//! Backend configuration
//!
//! ```yaml
//! type: local
//! path: ./state
//! workspaces: true
//! naming:
//!   strategy: unique
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::backend::{Backend, BackendSettings};
use crate::error::Result;
use crate::fs::FsBackend;
use crate::memory::MemoryBackend;
use crate::sqlite::SqliteBackend;

/// Which backend to open, and with what settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BackendConfig {
    /// JSON state files under a directory
    Local {
        path: PathBuf,
        #[serde(flatten)]
        settings: BackendSettings,
    },

    /// A single SQLite database file
    Sqlite {
        path: PathBuf,
        #[serde(flatten)]
        settings: BackendSettings,
    },

    /// Process memory; starts empty every run
    Memory {
        #[serde(flatten)]
        settings: BackendSettings,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Local {
            path: PathBuf::from("."),
            settings: BackendSettings::default(),
        }
    }
}

impl BackendConfig {
    /// Type tag reported by the backend this config opens
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Sqlite { .. } => "sqlite",
            Self::Memory { .. } => "memory",
        }
    }

    pub fn settings(&self) -> &BackendSettings {
        match self {
            Self::Local { settings, .. } | Self::Sqlite { settings, .. } | Self::Memory { settings } => settings,
        }
    }

    pub fn open(&self) -> Result<Box<dyn Backend>> {
        debug!(kind = self.type_tag(), "BackendConfig::open: called");
        let backend: Box<dyn Backend> = match self {
            Self::Local { path, settings } => Box::new(FsBackend::open(path, settings.clone())?),
            Self::Sqlite { path, settings } => Box::new(SqliteBackend::open(path, settings.clone())?),
            Self::Memory { settings } => Box::new(MemoryBackend::new(settings.clone())),
        };
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::WorkspaceNaming;
    use tempfile::tempdir;

    #[test]
    fn test_local_config_with_settings() {
        let yaml = r#"
type: local
path: /tmp/state
workspaces: false
"#;
        let config: BackendConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.type_tag(), "local");
        assert!(!config.settings().workspaces);
        assert!(config.settings().default_workspace);
    }

    #[test]
    fn test_sqlite_config_with_naming() {
        let yaml = r#"
type: sqlite
path: /tmp/state.db
managed: true
naming:
  strategy: unique
workspace-pattern: "app-*"
"#;
        let config: BackendConfig = serde_yaml::from_str(yaml).unwrap();
        let settings = config.settings();
        assert_eq!(settings.naming, WorkspaceNaming::GloballyUnique);
        assert_eq!(settings.workspace_pattern.as_deref(), Some("app-*"));
        assert!(settings.managed);
    }

    #[test]
    fn test_memory_config_defaults() {
        let config: BackendConfig = serde_yaml::from_str("type: memory\n").unwrap();
        assert_eq!(
            config,
            BackendConfig::Memory {
                settings: BackendSettings::default()
            }
        );
    }

    #[tokio::test]
    async fn test_open_reports_type_tag() {
        let temp = tempdir().unwrap();
        let configs = [
            BackendConfig::Local {
                path: temp.path().join("fs"),
                settings: BackendSettings::default(),
            },
            BackendConfig::Sqlite {
                path: temp.path().join("state.db"),
                settings: BackendSettings::default(),
            },
            BackendConfig::Memory {
                settings: BackendSettings::default(),
            },
        ];
        for config in configs {
            let backend = config.open().unwrap();
            assert_eq!(backend.backend_type(), config.type_tag());
            assert_eq!(backend.workspaces().await.unwrap(), vec!["default"]);
        }
    }
}
