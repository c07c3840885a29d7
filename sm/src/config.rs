//! StateMigrate configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use statestore::BackendConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lock::LockSettings;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Backend state is read from
    pub source: Option<BackendConfig>,

    /// Backend state is written to
    pub destination: Option<BackendConfig>,

    /// State locking during copies
    pub lock: LockConfig,

    /// Whether questions may be asked
    pub input: bool,

    /// Skip confirmations and overwrite the destination
    pub force_copy: bool,

    /// Skip the destination's tool version check
    pub ignore_remote_version: bool,

    /// Where logs and the selected workspace live
    pub data_dir: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            lock: LockConfig::default(),
            input: true,
            force_copy: false,
            ignore_remote_version: false,
            data_dir: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// Explicit path, then `./.sm.yml`, then `<config dir>/statemigrate/sm.yml`,
    /// then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".sm.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("statemigrate").join("sm.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Log level and data directory only, read before logging is set up
    ///
    /// Errors are swallowed here; the full load reports them once logging works.
    pub fn load_early(config_path: Option<&PathBuf>) -> (Option<String>, Option<PathBuf>) {
        match Self::load(config_path) {
            Ok(config) => (config.log_level, config.data_dir),
            Err(_) => (None, None),
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Data directory, defaulting to `<local data dir>/statemigrate`
    pub fn data_dir(&self) -> PathBuf {
        resolve_data_dir(self.data_dir.as_deref())
    }
}

/// `explicit` when given, otherwise `<local data dir>/statemigrate`
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("statemigrate"),
    }
}

/// State locking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LockConfig {
    /// Take state locks at all
    pub enabled: bool,

    /// How long to keep retrying a held lock, in milliseconds
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 0,
        }
    }
}

impl LockConfig {
    pub fn settings(&self) -> LockSettings {
        LockSettings {
            enabled: self.enabled,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statestore::WorkspaceNaming;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.source.is_none());
        assert!(config.input);
        assert!(!config.force_copy);
        assert!(config.lock.enabled);
        assert_eq!(config.lock.settings(), LockSettings::default());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
source:
  type: local
  path: /tmp/old
destination:
  type: sqlite
  path: /tmp/new/state.db
  naming:
    strategy: unique
lock:
  timeout-ms: 2500
input: false
force-copy: true
ignore-remote-version: true
data-dir: /tmp/sm-data
log-level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.source.as_ref().map(BackendConfig::type_tag), Some("local"));
        let destination = config.destination.as_ref().unwrap();
        assert_eq!(destination.type_tag(), "sqlite");
        assert_eq!(destination.settings().naming, WorkspaceNaming::GloballyUnique);
        assert!(config.lock.enabled);
        assert_eq!(config.lock.settings().timeout, Duration::from_millis(2500));
        assert!(!config.input);
        assert!(config.force_copy);
        assert!(config.ignore_remote_version);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/sm-data"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("lock:\n  enabled: false\n").unwrap();
        assert!(!config.lock.enabled);
        assert_eq!(config.lock.timeout_ms, 0);
        assert!(config.input);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sm.yml");
        fs::write(&path, "force-copy: true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.force_copy);
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing.yml");
        assert!(Config::load(Some(&missing)).is_err());

        let invalid = temp.path().join("invalid.yml");
        fs::write(&invalid, "lock: [not, a, map]\n").unwrap();
        let err = Config::load(Some(&invalid)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_early_ignores_errors() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing.yml");
        assert_eq!(Config::load_early(Some(&missing)), (None, None));
    }

    #[test]
    fn test_data_dir_default_is_named() {
        assert!(resolve_data_dir(None).ends_with("statemigrate"));
    }
}
