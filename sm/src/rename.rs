//! Single-wildcard workspace rename patterns

use std::fmt;
use std::str::FromStr;

use crate::error::{MigrateError, Result};

/// Placeholder replaced by the original workspace name
pub const WILDCARD: char = '*';

/// A pattern like `app-*-east` with exactly one wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePattern {
    prefix: String,
    suffix: String,
}

impl RenamePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut parts = pattern.splitn(3, WILDCARD);
        let prefix = parts.next().unwrap_or_default();
        let Some(suffix) = parts.next() else {
            return Err(MigrateError::PatternValidation(format!(
                "the pattern must have an '{WILDCARD}'"
            )));
        };
        if parts.next().is_some() {
            return Err(MigrateError::PatternValidation(format!(
                "the pattern '{WILDCARD}' cannot be used more than once"
            )));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// The bare wildcard: every workspace keeps its name
    pub fn identity() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }

    pub fn apply(&self, name: &str) -> String {
        format!("{}{}{}", self.prefix, name, self.suffix)
    }
}

impl FromStr for RenamePattern {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, WILDCARD, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_apply_prefix() {
        let pattern = RenamePattern::parse("app-*").unwrap();
        assert_eq!(pattern.apply("prod"), "app-prod");
    }

    #[test]
    fn test_apply_infix() {
        let pattern = RenamePattern::parse("app-*-region1").unwrap();
        assert_eq!(pattern.apply("prod"), "app-prod-region1");
    }

    #[test]
    fn test_missing_wildcard_rejected() {
        assert!(matches!(RenamePattern::parse("app"), Err(MigrateError::PatternValidation(_))));
        assert!(matches!(RenamePattern::parse(""), Err(MigrateError::PatternValidation(_))));
    }

    #[test]
    fn test_repeated_wildcard_rejected() {
        let err = RenamePattern::parse("*-*").unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_identity() {
        let identity = RenamePattern::parse("*").unwrap();
        assert_eq!(identity, RenamePattern::identity());
        assert!(identity.is_identity());
        assert_eq!(identity.apply("staging"), "staging");
    }

    #[test]
    fn test_display_round_trips() {
        let pattern: RenamePattern = "net-*-east".parse().unwrap();
        assert_eq!(pattern.to_string(), "net-*-east");
    }

    proptest! {
        #[test]
        fn prop_apply_wraps_name(prefix in "[a-z0-9-]{0,8}", suffix in "[a-z0-9-]{0,8}", name in "[a-z0-9_.-]{1,16}") {
            let pattern = RenamePattern::parse(&format!("{prefix}*{suffix}")).unwrap();
            let renamed = pattern.apply(&name);
            prop_assert!(renamed.starts_with(&prefix));
            prop_assert!(renamed.ends_with(&suffix));
            prop_assert_eq!(renamed.len(), prefix.len() + name.len() + suffix.len());
        }

        #[test]
        fn prop_wildcard_count_other_than_one_rejected(text in "[a-z*]{0,12}") {
            let count = text.matches(WILDCARD).count();
            prop_assert_eq!(RenamePattern::parse(&text).is_ok(), count == 1);
        }
    }
}
