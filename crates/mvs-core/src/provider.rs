//! The requirement-provider boundary.
//!
//! A provider answers "what does this module version require?" and is
//! typically backed by network or disk I/O. The resolver calls it from many
//! tasks at once, so implementations must be `Send + Sync`; the resolver
//! memoizes answers, so each key is asked at most once per cache.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::ModuleVersion;

/// How much of a module's requirement graph is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pruning {
    /// Every transitive requirement is loaded.
    #[default]
    Unpruned,
    /// Requirements of modules that declare pruning are recorded but not
    /// expanded further.
    Pruned,
    /// Like `Pruned`, with several main modules.
    Workspace,
}

impl std::fmt::Display for Pruning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Pruning::Unpruned => "unpruned",
            Pruning::Pruned => "pruned",
            Pruning::Workspace => "workspace",
        })
    }
}

/// A failure reported by, or detected in the answers of, a provider.
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    /// The module version does not exist.
    #[error("{module}: not found")]
    NotFound { module: ModuleVersion },

    /// The metadata could not be fetched or parsed.
    #[error("{module}: {message}")]
    Fetch {
        module: ModuleVersion,
        message: String,
    },

    /// The provider does not implement an optional operation.
    #[error("{module}: {operation} is not supported by this provider")]
    Unsupported {
        module: ModuleVersion,
        operation: &'static str,
    },

    /// The provider answered with data that breaks its contract.
    #[error("{module}: inconsistent provider data: {message}")]
    #[diagnostic(help("The requirement source returned malformed metadata for this module"))]
    Inconsistent {
        module: ModuleVersion,
        message: String,
    },

    #[error("{module}: {source}")]
    Other {
        module: ModuleVersion,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProviderError {
    /// The module version the failure is about.
    pub fn module(&self) -> &ModuleVersion {
        match self {
            ProviderError::NotFound { module }
            | ProviderError::Fetch { module, .. }
            | ProviderError::Unsupported { module, .. }
            | ProviderError::Inconsistent { module, .. }
            | ProviderError::Other { module, .. } => module,
        }
    }
}

/// Source of direct requirements for module versions.
#[async_trait]
pub trait RequirementProvider: Send + Sync {
    /// Direct requirements of `module`, in declaration order.
    async fn required(&self, module: &ModuleVersion) -> Result<Vec<ModuleVersion>, ProviderError>;

    /// The version `module` should be upgraded to (possibly itself).
    async fn upgrade(&self, module: &ModuleVersion) -> Result<ModuleVersion, ProviderError> {
        Ok(module.clone())
    }

    /// The next lower version of `module.path`, or `path@none`.
    async fn previous(&self, module: &ModuleVersion) -> Result<ModuleVersion, ProviderError> {
        Err(ProviderError::Unsupported {
            module: module.clone(),
            operation: "previous",
        })
    }

    /// Whether `module` declares a pruned requirement graph.
    fn pruning(&self, _module: &ModuleVersion) -> Pruning {
        Pruning::Unpruned
    }
}
