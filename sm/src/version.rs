//! Remote tool-version compatibility checks

use async_trait::async_trait;
use statestore::Backend;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One finding from a version check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Decides whether writing to a workspace would break its remote tool version
#[async_trait]
pub trait VersionCheck: Send + Sync {
    async fn check(&self, backend: &dyn Backend, workspace: &str) -> Vec<Diagnostic>;
}

/// Compares the major.minor version a backend requires with the running tool's
#[derive(Debug, Clone)]
pub struct ToolVersionCheck {
    local: String,
}

impl Default for ToolVersionCheck {
    fn default() -> Self {
        Self::new(statestore::TOOL_VERSION)
    }
}

impl ToolVersionCheck {
    pub fn new(local: impl Into<String>) -> Self {
        Self { local: local.into() }
    }
}

/// Major and minor components of a version string like `1.4` or `1.4.2`
fn major_minor(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.trim().trim_start_matches('v').split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

#[async_trait]
impl VersionCheck for ToolVersionCheck {
    async fn check(&self, backend: &dyn Backend, workspace: &str) -> Vec<Diagnostic> {
        debug!(%workspace, local = %self.local, "ToolVersionCheck::check: called");
        let remote = match backend.remote_version(workspace).await {
            Ok(Some(remote)) => remote,
            Ok(None) => return Vec::new(),
            Err(e) => {
                return vec![Diagnostic::error(
                    "Error checking remote tool version",
                    format!("The remote version for workspace {workspace:?} could not be read: {e}"),
                )];
            }
        };

        let (Some(remote_mm), Some(local_mm)) = (major_minor(&remote), major_minor(&self.local)) else {
            return vec![Diagnostic::warning(
                "Unable to compare tool versions",
                format!("Remote version {remote:?} or local version {:?} is not a version number", self.local),
            )];
        };

        if remote_mm != local_mm {
            return vec![Diagnostic::error(
                "Incompatible tool version",
                format!(
                    "Workspace {workspace:?} requires version {}.{}, but this is version {}. Upgrade or \
                     downgrade locally, change the workspace's required version, or pass \
                     --ignore-remote-version.",
                    remote_mm.0, remote_mm.1, self.local
                ),
            )];
        }
        Vec::new()
    }
}
