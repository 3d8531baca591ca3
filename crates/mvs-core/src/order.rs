//! Version ordering strategies.
//!
//! The resolver is parameterized over a [`VersionOrder`]. Two strategies ship
//! with the crate:
//! - [`SemverOrder`]: semantic versions, tolerant of a leading `v` and of
//!   missing minor/patch components (`1` and `1.2` read as `1.0.0`, `1.2.0`)
//! - [`DottedOrder`]: part-wise ordering for toolchain-style versions
//!   (`1.21`, `1.21rc1`, `1.22-beta`). Parts split on `.`, `-` and `+` and
//!   at digit/letter boundaries; `alpha` < `beta` < `rc` < release
//!
//! [`OrderByPath`] routes individual paths (for example a `toolchain`
//! pseudo-path) to a different strategy than ordinary modules.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::module::NONE;

/// A total, deterministic ordering over the versions of a module path.
pub trait VersionOrder: Send + Sync {
    /// Compare two versions of `path`. Never called with [`NONE`].
    fn compare(&self, path: &str, a: &str, b: &str) -> Ordering;

    /// Compare two versions of `path`, treating [`NONE`] as the bottom
    /// element. Versions the strategy considers equivalent but that are
    /// spelled differently are ordered by their text so the result stays
    /// total.
    fn cmp_versions(&self, path: &str, a: &str, b: &str) -> Ordering {
        match (a == NONE, b == NONE) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .compare(path, a, b)
                .then_with(|| a.cmp(b)),
        }
    }

    /// The larger of `a` and `b`; ties keep `a`. `max_version(v, "none") == v`.
    fn max_version<'a>(&self, path: &str, a: &'a str, b: &'a str) -> &'a str {
        if self.cmp_versions(path, a, b) == Ordering::Less {
            b
        } else {
            a
        }
    }
}

impl<T: VersionOrder + ?Sized> VersionOrder for Arc<T> {
    fn compare(&self, path: &str, a: &str, b: &str) -> Ordering {
        (**self).compare(path, a, b)
    }
}

/// Semantic-version ordering. Strings that are not semver (even after
/// padding) sort below every valid version and compare as text among
/// themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverOrder;

impl SemverOrder {
    fn parse(version: &str) -> Option<semver::Version> {
        let v = version.strip_prefix('v').unwrap_or(version);
        if let Ok(parsed) = semver::Version::parse(v) {
            return Some(parsed);
        }
        // Pad the numeric core: "1" -> "1.0.0", "1.2-rc" -> "1.2.0-rc".
        let split = v.find(['-', '+']).unwrap_or(v.len());
        let (core, rest) = v.split_at(split);
        let padded = match core.split('.').count() {
            1 => format!("{core}.0.0{rest}"),
            2 => format!("{core}.0{rest}"),
            _ => return None,
        };
        semver::Version::parse(&padded).ok()
    }
}

impl VersionOrder for SemverOrder {
    fn compare(&self, _path: &str, a: &str, b: &str) -> Ordering {
        match (Self::parse(a), Self::parse(b)) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => a.cmp(b),
        }
    }
}

/// Part-wise ordering for toolchain-style version strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DottedOrder;

impl VersionOrder for DottedOrder {
    fn compare(&self, _path: &str, a: &str, b: &str) -> Ordering {
        let a = Part::split(a);
        let b = Part::split(b);
        for i in 0..a.len().max(b.len()) {
            let ord = match (a.get(i), b.get(i)) {
                (Some(x), Some(y)) => x.cmp_part(y),
                (Some(x), None) => x.cmp_missing(),
                (None, Some(y)) => y.cmp_missing().reverse(),
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Dispatches to a per-path strategy, falling back to a default.
#[derive(Clone)]
pub struct OrderByPath {
    default: Arc<dyn VersionOrder>,
    overrides: BTreeMap<String, Arc<dyn VersionOrder>>,
}

impl OrderByPath {
    pub fn new(default: Arc<dyn VersionOrder>) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Use `order` for every version of `path`.
    pub fn with_path(mut self, path: impl Into<String>, order: Arc<dyn VersionOrder>) -> Self {
        self.overrides.insert(path.into(), order);
        self
    }
}

impl VersionOrder for OrderByPath {
    fn compare(&self, path: &str, a: &str, b: &str) -> Ordering {
        self.overrides
            .get(path)
            .unwrap_or(&self.default)
            .compare(path, a, b)
    }
}

/// One piece of a toolchain version: `1.21rc1` is `1`, `21`, `rc`, `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Num(u64),
    /// Pre-release stage: 0 alpha, 1 beta, 2 rc.
    Pre(u8),
    Word(String),
}

impl Part {
    fn split(version: &str) -> Vec<Part> {
        let version = version.strip_prefix('v').unwrap_or(version);
        let mut parts = Vec::new();
        for piece in version.split(['.', '-', '+']).filter(|p| !p.is_empty()) {
            let mut start = 0;
            let bytes = piece.as_bytes();
            for i in 1..=bytes.len() {
                if i == bytes.len() || bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit() {
                    parts.push(Part::parse(&piece[start..i]));
                    start = i;
                }
            }
        }
        parts
    }

    fn parse(token: &str) -> Part {
        if let Ok(n) = token.parse::<u64>() {
            return Part::Num(n);
        }
        match token.to_ascii_lowercase().as_str() {
            "alpha" | "a" => Part::Pre(0),
            "beta" | "b" => Part::Pre(1),
            "rc" | "c" => Part::Pre(2),
            word => Part::Word(word.to_string()),
        }
    }

    /// How this part compares to a version that has already ended:
    /// trailing zeros are padding, anything non-numeric marks a pre-release.
    fn cmp_missing(&self) -> Ordering {
        match self {
            Part::Num(0) => Ordering::Equal,
            Part::Num(_) => Ordering::Greater,
            Part::Pre(_) | Part::Word(_) => Ordering::Less,
        }
    }

    fn cmp_part(&self, other: &Part) -> Ordering {
        match (self, other) {
            (Part::Num(a), Part::Num(b)) => a.cmp(b),
            (Part::Num(_), _) => Ordering::Greater,
            (_, Part::Num(_)) => Ordering::Less,
            (Part::Pre(a), Part::Pre(b)) => a.cmp(b),
            (Part::Pre(_), Part::Word(_)) => Ordering::Greater,
            (Part::Word(_), Part::Pre(_)) => Ordering::Less,
            (Part::Word(a), Part::Word(b)) => a.cmp(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_bottom() {
        let order = SemverOrder;
        assert_eq!(order.cmp_versions("a", NONE, "0.0.1"), Ordering::Less);
        assert_eq!(order.cmp_versions("a", "0.0.1", NONE), Ordering::Greater);
        assert_eq!(order.cmp_versions("a", NONE, NONE), Ordering::Equal);
        assert_eq!(order.max_version("a", "1.0.0", NONE), "1.0.0");
        assert_eq!(order.max_version("a", NONE, "1.0.0"), "1.0.0");
    }

    #[test]
    fn semver_pads_short_versions() {
        let order = SemverOrder;
        assert_eq!(order.cmp_versions("a", "1", "2"), Ordering::Less);
        assert_eq!(order.cmp_versions("a", "1.10", "1.9"), Ordering::Greater);
        assert_eq!(order.cmp_versions("a", "v1.2.3", "1.2.4"), Ordering::Less);
        assert_eq!(order.max_version("a", "1.0.0-rc.1", "1.0.0"), "1.0.0");
    }

    #[test]
    fn semver_invalid_sorts_low() {
        let order = SemverOrder;
        assert_eq!(order.cmp_versions("a", "garbage", "0.0.1"), Ordering::Less);
        assert_eq!(order.cmp_versions("a", "abc", "abd"), Ordering::Less);
    }

    #[test]
    fn equivalent_spellings_still_total() {
        let order = SemverOrder;
        // "1" and "1.0.0" are the same semver; text breaks the tie.
        assert_eq!(order.cmp_versions("a", "1", "1.0.0"), Ordering::Less);
        assert_eq!(order.max_version("a", "1.0.0", "1"), "1.0.0");
        assert_eq!(order.max_version("a", "1", "1.0.0"), "1.0.0");
    }

    #[test]
    fn dotted_qualifiers() {
        let order = DottedOrder;
        assert_eq!(order.cmp_versions("go", "1.21rc1", "1.21"), Ordering::Less);
        assert_eq!(order.cmp_versions("go", "1.21-alpha", "1.21-beta"), Ordering::Less);
        assert_eq!(order.cmp_versions("go", "1.21rc2", "1.21rc10"), Ordering::Less);
        assert_eq!(order.cmp_versions("go", "1.21", "1.21.1"), Ordering::Less);
        assert_eq!(order.cmp_versions("go", "1.9", "1.21"), Ordering::Less);
        assert_eq!(order.cmp_versions("go", "1.21.0-jre", "1.21.0"), Ordering::Less);
    }

    #[test]
    fn dotted_trailing_zeros_equivalent() {
        let order = DottedOrder;
        assert_eq!(order.compare("go", "1.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn order_by_path_routes_overrides() {
        let order =
            OrderByPath::new(Arc::new(SemverOrder)).with_path("toolchain", Arc::new(DottedOrder));
        // Semver would reject "1.21rc1"; the dotted strategy understands it.
        assert_eq!(order.cmp_versions("toolchain", "1.21rc1", "1.20"), Ordering::Greater);
        assert_eq!(order.cmp_versions("example.com/a", "1.21rc1", "1.20"), Ordering::Less);
    }
}
