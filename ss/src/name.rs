//! Workspace name validation shared by every backend

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, StoreError};

/// Longest workspace name any backend accepts
pub const MAX_WORKSPACE_NAME_LEN: usize = 90;

static WORKSPACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("workspace name regex is valid")
});

/// Reject names that could escape a backend's storage layout or confuse enumeration
pub fn validate_workspace_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name must not be empty")
    } else if name.len() > MAX_WORKSPACE_NAME_LEN {
        Some("name is too long")
    } else if !WORKSPACE_NAME.is_match(name) {
        Some("only letters, digits, '.', '_' and '-' are allowed, starting with a letter or digit")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidWorkspaceName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
