use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The version string denoting absence. It sorts below every other version
/// of every path.
pub const NONE: &str = "none";

/// A `(path, version)` identity. Equality is by both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub path: String,
    pub version: String,
}

impl ModuleVersion {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    /// The bottom element for `path`.
    pub fn none(path: impl Into<String>) -> Self {
        Self::new(path, NONE)
    }

    pub fn is_none(&self) -> bool {
        self.version == NONE
    }

    /// Parse `"path@version"`. The version is everything after the last `@`,
    /// so paths may themselves contain `@`.
    pub fn parse(s: &str) -> Option<Self> {
        let (path, version) = s.rsplit_once('@')?;
        if path.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self::new(path, version))
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}@{}", self.path, self.version)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid module version `{0}`: expected `path@version`")]
pub struct ParseModuleError(pub String);

impl FromStr for ModuleVersion {
    type Err = ParseModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseModuleError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let m = ModuleVersion::parse("example.com/a@1.2.0").unwrap();
        assert_eq!(m.path, "example.com/a");
        assert_eq!(m.version, "1.2.0");
        assert_eq!(m.to_string(), "example.com/a@1.2.0");
    }

    #[test]
    fn parse_uses_last_separator() {
        let m: ModuleVersion = "@scope/pkg@2".parse().unwrap();
        assert_eq!(m.path, "@scope/pkg");
        assert_eq!(m.version, "2");
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert!(ModuleVersion::parse("a").is_none());
        assert!(ModuleVersion::parse("a@").is_none());
        assert!(ModuleVersion::parse("@1").is_none());
        assert!("nope".parse::<ModuleVersion>().is_err());
    }

    #[test]
    fn none_sentinel() {
        let m = ModuleVersion::none("b");
        assert!(m.is_none());
        assert_eq!(m.to_string(), "b@none");
        assert!(!ModuleVersion::new("b", "1").is_none());
    }

    #[test]
    fn display_without_version() {
        assert_eq!(ModuleVersion::new("main", "").to_string(), "main");
    }
}
