//! Errors produced by graph loading and the algorithms built on it.

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use mvs_core::{ModuleVersion, ProviderError};
use thiserror::Error;

use crate::conflict::ConstraintError;

/// One module on a [`BuildListError`] chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub module: ModuleVersion,
    /// The edge from the previous step to this one was an upgrade rather
    /// than a declared requirement.
    pub upgraded: bool,
}

/// A provider failure together with the requirement chain that reached it.
///
/// Renders as `A@1 requires B@1 requires C@2: <err>`.
#[derive(Debug, Clone, Error, Diagnostic)]
#[diagnostic(help("Every module on this chain is needed to compute the build list"))]
pub struct BuildListError {
    steps: Vec<ChainStep>,
    #[source]
    err: Arc<ProviderError>,
}

impl BuildListError {
    /// Build an error for `path` (root first). `is_upgrade(from, to)` tells
    /// whether the hop `from -> to` was an upgrade.
    pub fn new(
        path: Vec<ModuleVersion>,
        err: Arc<ProviderError>,
        is_upgrade: impl Fn(&ModuleVersion, &ModuleVersion) -> bool,
    ) -> Self {
        let mut steps: Vec<ChainStep> = Vec::with_capacity(path.len());
        for module in path {
            let upgraded = steps
                .last()
                .is_some_and(|prev| is_upgrade(&prev.module, &module));
            steps.push(ChainStep { module, upgraded });
        }
        Self { steps, err }
    }

    /// The failing module (last on the chain).
    pub fn module(&self) -> Option<&ModuleVersion> {
        self.steps.last().map(|s| &s.module)
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// The chain as plain module versions, root first.
    pub fn path(&self) -> Vec<ModuleVersion> {
        self.steps.iter().map(|s| s.module.clone()).collect()
    }

    pub fn err(&self) -> &Arc<ProviderError> {
        &self.err
    }
}

impl fmt::Display for BuildListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Leading modules without a version are synthetic roots.
        let steps: Vec<&ChainStep> = self
            .steps
            .iter()
            .skip_while(|s| s.module.version.is_empty())
            .collect();
        let Some((last, chain)) = steps.split_last() else {
            return write!(f, "{}", self.err);
        };
        for (i, step) in chain.iter().enumerate() {
            let next = steps[i + 1];
            let reason = if next.upgraded { "updating to" } else { "requires" };
            write!(f, "{} {reason} ", step.module)?;
        }
        // Provider errors already name their module.
        if self.err.module() == &last.module {
            write!(f, "{}", self.err)
        } else {
            write!(f, "{}: {}", last.module, self.err)
        }
    }
}

/// Everything that can stop a resolution.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ResolveError {
    /// A module needed for the build list could not be loaded.
    #[error(transparent)]
    BuildList(#[from] Box<BuildListError>),

    /// Pinned versions cannot all be selected.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// A direct provider call failed outside any graph traversal.
    #[error(transparent)]
    Provider(Arc<ProviderError>),

    /// The traversal was cancelled; no partial result is returned.
    #[error("resolution cancelled")]
    Cancelled,
}

impl From<BuildListError> for ResolveError {
    fn from(err: BuildListError) -> Self {
        ResolveError::BuildList(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> ModuleVersion {
        ModuleVersion::parse(s).unwrap()
    }

    fn fetch_error(module: &str) -> Arc<ProviderError> {
        Arc::new(ProviderError::Fetch {
            module: mv(module),
            message: "unexpected EOF".into(),
        })
    }

    #[test]
    fn renders_requirement_chain() {
        let err = BuildListError::new(
            vec![mv("A@1"), mv("B@1"), mv("C@2")],
            fetch_error("C@2"),
            |_, _| false,
        );
        assert_eq!(err.to_string(), "A@1 requires B@1 requires C@2: unexpected EOF");
        assert_eq!(err.module(), Some(&mv("C@2")));
        assert_eq!(err.path().len(), 3);
    }

    #[test]
    fn renders_upgrade_hops() {
        let err = BuildListError::new(
            vec![mv("A@1"), mv("B@1"), mv("B@2")],
            fetch_error("B@2"),
            |from, to| from.path == to.path,
        );
        assert_eq!(err.to_string(), "A@1 requires B@1 updating to B@2: unexpected EOF");
        assert!(err.steps()[2].upgraded);
        assert!(!err.steps()[1].upgraded);
    }

    #[test]
    fn skips_unversioned_roots() {
        let err = BuildListError::new(
            vec![ModuleVersion::new("main", ""), mv("B@1")],
            fetch_error("B@1"),
            |_, _| false,
        );
        assert_eq!(err.to_string(), "B@1: unexpected EOF");
    }

    #[test]
    fn names_last_module_when_error_is_about_another() {
        let err = BuildListError::new(vec![mv("A@1"), mv("B@1")], fetch_error("Z@9"), |_, _| false);
        assert_eq!(err.to_string(), "A@1 requires B@1: Z@9: unexpected EOF");
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(ResolveError::Cancelled.to_string(), "resolution cancelled");
    }
}
