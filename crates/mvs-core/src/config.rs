use serde::{Deserialize, Serialize};
use std::path::Path;

use mvs_util::errors::MvsError;

use crate::provider::Pruning;

/// Resolver configuration loaded from the `[resolver]` table of `mvs.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MvsConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Settings for the traversal engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of concurrent provider calls.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default)]
    pub fetch: FetchPolicy,
    #[serde(default)]
    pub pruning: Pruning,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            fetch: FetchPolicy::default(),
            pruning: Pruning::default(),
        }
    }
}

/// Which reachable module versions the traversal fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Fetch every reachable version. The loaded graph does not depend on
    /// fetch completion order, and every reachable provider failure is
    /// reported.
    #[default]
    All,
    /// Fetch a version only if it beats the version selected for its path
    /// at the moment it is reached. Fewer fetches; requirements and
    /// failures of versions that lose are never seen, and which versions
    /// lose can depend on completion order.
    SelectedOnly,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ResolverConfig {
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }
}

impl MvsConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        let config: MvsConfig = toml::from_str(content).map_err(|e| MvsError::Config {
            message: format!("Failed to parse config: {e}"),
        })?;
        if config.resolver.jobs == 0 {
            return Err(MvsError::Config {
                message: "resolver.jobs must be at least 1".to_string(),
            }
            .into());
        }
        Ok(config)
    }

    /// Load configuration from `path`, or defaults if the file does not exist.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| MvsError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }
}
