//! Advisory lock metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who holds a state lock, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock ID, returned by `Locker::lock` and required to unlock
    pub id: String,

    /// What the holder is doing (e.g. "migration source state")
    pub operation: String,

    /// user@host of the holder
    pub who: String,

    /// Tool version of the holder
    pub version: String,

    pub created: DateTime<Utc>,

    /// Backend-specific location of the locked state
    pub path: String,
}

impl LockInfo {
    /// New lock info for the current process
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            operation: operation.into(),
            who: current_user(),
            version: crate::TOOL_VERSION.to_string(),
            created: Utc::now(),
            path: String::new(),
        }
    }

    /// Same lock, recorded against a concrete storage path
    pub fn at_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lock Info:")?;
        writeln!(f, "  ID:        {}", self.id)?;
        writeln!(f, "  Path:      {}", self.path)?;
        writeln!(f, "  Operation: {}", self.operation)?;
        writeln!(f, "  Who:       {}", self.who)?;
        writeln!(f, "  Version:   {}", self.version)?;
        write!(f, "  Created:   {}", self.created.to_rfc3339())
    }
}

fn current_user() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_ids_are_unique() {
        let a = LockInfo::new("migration source state");
        let b = LockInfo::new("migration source state");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_display_includes_operation_and_path() {
        let info = LockInfo::new("migration destination state").at_path("/tmp/state.json");
        let rendered = info.to_string();
        assert!(rendered.contains("migration destination state"));
        assert!(rendered.contains("/tmp/state.json"));
        assert!(rendered.contains(&info.id));
    }
}
