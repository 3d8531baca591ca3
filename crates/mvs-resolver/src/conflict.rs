//! Conflict reporting for pinned versions that cannot be selected.

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use mvs_core::{ModuleVersion, ProviderError};
use thiserror::Error;

/// Why a [`Conflict`] chain ends where it does.
#[derive(Debug, Clone)]
pub enum ConflictCause {
    /// The pin that the last module on the chain exceeds.
    Constraint(ModuleVersion),
    /// The requirements of a module on the chain could not be loaded.
    Error(Arc<ProviderError>),
    /// A main module (the only step on the chain) was pinned to another
    /// version of its own path.
    MainModule(ModuleVersion),
}

/// A requirement chain proving that a pinned version cannot be selected.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// From a main module to the module that rules the pin out.
    pub path: Vec<ModuleVersion>,
    pub cause: ConflictCause,
}

impl Conflict {
    pub fn constraint(path: Vec<ModuleVersion>, constraint: ModuleVersion) -> Self {
        Self {
            path,
            cause: ConflictCause::Constraint(constraint),
        }
    }

    pub fn error(path: Vec<ModuleVersion>, err: Arc<ProviderError>) -> Self {
        Self {
            path,
            cause: ConflictCause::Error(err),
        }
    }

    pub fn main_module(main: ModuleVersion, pin: ModuleVersion) -> Self {
        Self {
            path: vec![main],
            cause: ConflictCause::MainModule(pin),
        }
    }

    /// The pin this conflict is about, if any.
    pub fn constraint_module(&self) -> Option<&ModuleVersion> {
        match &self.cause {
            ConflictCause::Constraint(m) | ConflictCause::MainModule(m) => Some(m),
            ConflictCause::Error(_) => None,
        }
    }

    /// Whether the provider error already names the last module on the chain.
    fn error_names_last(&self, err: &ProviderError) -> bool {
        self.path.last() == Some(err.module())
    }

    /// A one-line summary naming only the two ends of the chain.
    pub fn summary(&self) -> String {
        let (Some(first), Some(last)) = (self.path.first(), self.path.last()) else {
            return "(invalid conflict: empty path)".to_string();
        };
        match &self.cause {
            ConflictCause::Error(err) => match (self.path.len(), self.error_names_last(err)) {
                (1, true) => err.to_string(),
                (1, false) => format!("{first}: {err}"),
                (_, true) => format!("{first} requires {err}"),
                (_, false) => format!("{first} requires {last}: {err}"),
            },
            ConflictCause::MainModule(pin) => {
                format!("main module {first} cannot be pinned to {pin}")
            }
            ConflictCause::Constraint(c) if self.path.len() == 1 => {
                format!("{first} is above {c}")
            }
            ConflictCause::Constraint(c) => {
                let adverb = if self.path.len() > 2 { "indirectly " } else { "" };
                format!("{first} {adverb}requires {last}, but {c} is requested")
            }
        }
    }
}

/// The full chain: `A@1 requires B@1 requires C@2, but C@1 is requested`.
impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let ConflictCause::MainModule(_) = &self.cause {
            return f.write_str(&self.summary());
        }
        let chain = match &self.cause {
            ConflictCause::Error(err) if self.error_names_last(err) => {
                &self.path[..self.path.len() - 1]
            }
            _ => &self.path[..],
        };
        let mut first = true;
        for m in chain {
            if !first {
                f.write_str(" requires ")?;
            }
            write!(f, "{m}")?;
            first = false;
        }
        match &self.cause {
            ConflictCause::Constraint(c) if self.path.len() == 1 => write!(f, " is above {c}"),
            ConflictCause::Constraint(c) => write!(f, ", but {c} is requested"),
            ConflictCause::Error(err) if chain.is_empty() => write!(f, "{err}"),
            ConflictCause::Error(err) if chain.len() < self.path.len() => {
                write!(f, " requires {err}")
            }
            ConflictCause::Error(err) => write!(f, ": {err}"),
            ConflictCause::MainModule(_) => Ok(()),
        }
    }
}

/// Every conflict found while applying a set of pins.
#[derive(Debug, Clone, Default, Error, Diagnostic)]
#[diagnostic(help(
    "Pin the modules on each chain to lower versions, or relax the requested versions"
))]
pub struct ConstraintError {
    pub conflicts: Vec<Conflict>,
}

impl ConstraintError {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("version constraints conflict:")?;
        for c in &self.conflicts {
            write!(f, "\n\t{}", c.summary())?;
        }
        Ok(())
    }
}
