//! In-memory requirement provider loaded from a TOML table.
//!
//! ```toml
//! target = "A@1"
//! pruned = ["B@1"]
//! [modules]
//! "A@1" = ["B@1", "C@1"]
//! "B@1" = ["C@2"]
//! "C@1" = []
//! "C@2" = []
//! [failing]
//! "D@1" = "checksum mismatch"
//! ```
//!
//! The known versions of a path are the keys of `modules` and `failing` for
//! that path. `upgrade` answers with the highest known version and
//! `previous` with the next lower one.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mvs_util::errors::MvsError;
use serde::Deserialize;

use crate::module::ModuleVersion;
use crate::order::VersionOrder;
use crate::provider::{ProviderError, Pruning, RequirementProvider};

#[derive(Debug, Default, Deserialize)]
struct RawTable {
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    pruned: Vec<String>,
    #[serde(default)]
    modules: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    failing: BTreeMap<String, String>,
}

/// A fixed requirement graph that answers provider calls from memory.
pub struct RequirementTable {
    targets: Vec<ModuleVersion>,
    requirements: BTreeMap<ModuleVersion, Vec<ModuleVersion>>,
    failures: BTreeMap<ModuleVersion, String>,
    pruned: BTreeSet<ModuleVersion>,
    order: Arc<dyn VersionOrder>,
    fetches: Mutex<BTreeMap<ModuleVersion, usize>>,
    total: AtomicUsize,
}

fn parse_module(s: &str) -> Result<ModuleVersion, MvsError> {
    ModuleVersion::parse(s).ok_or_else(|| MvsError::Table {
        message: format!("invalid module `{s}`"),
    })
}

impl RequirementTable {
    /// An empty table.
    pub fn new(order: Arc<dyn VersionOrder>) -> Self {
        Self {
            targets: Vec::new(),
            requirements: BTreeMap::new(),
            failures: BTreeMap::new(),
            pruned: BTreeSet::new(),
            order,
            fetches: Mutex::new(BTreeMap::new()),
            total: AtomicUsize::new(0),
        }
    }

    /// Parse a table document.
    pub fn from_toml_str(content: &str, order: Arc<dyn VersionOrder>) -> miette::Result<Self> {
        let raw: RawTable = toml::from_str(content).map_err(|e| MvsError::Table {
            message: format!("Failed to parse requirement table: {e}"),
        })?;

        let mut table = Self::new(order);
        for target in raw.target.iter().chain(raw.targets.iter()) {
            table.targets.push(parse_module(target)?);
        }
        for (module, reqs) in &raw.modules {
            let reqs = reqs
                .iter()
                .map(|r| parse_module(r))
                .collect::<Result<Vec<_>, _>>()?;
            table.requirements.insert(parse_module(module)?, reqs);
        }
        for (module, message) in raw.failing {
            table.failures.insert(parse_module(&module)?, message);
        }
        for module in &raw.pruned {
            table.pruned.insert(parse_module(module)?);
        }
        Ok(table)
    }

    /// Load a table from a TOML file.
    pub fn from_path(path: &Path, order: Arc<dyn VersionOrder>) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MvsError::Table {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content, order)
    }

    /// Record the direct requirements of `module`.
    pub fn with_module(mut self, module: ModuleVersion, reqs: Vec<ModuleVersion>) -> Self {
        self.requirements.insert(module, reqs);
        self
    }

    /// Make every fetch of `module` fail with `message`.
    pub fn with_failure(mut self, module: ModuleVersion, message: impl Into<String>) -> Self {
        self.requirements.remove(&module);
        self.failures.insert(module, message.into());
        self
    }

    /// Declare that `module` has a pruned requirement graph.
    pub fn with_pruned(mut self, module: ModuleVersion) -> Self {
        self.pruned.insert(module);
        self
    }

    /// The target modules named by the table (`target` then `targets`).
    pub fn targets(&self) -> &[ModuleVersion] {
        &self.targets
    }

    /// Every module with recorded requirements, sorted.
    pub fn modules(&self) -> impl Iterator<Item = (&ModuleVersion, &[ModuleVersion])> {
        self.requirements.iter().map(|(m, reqs)| (m, reqs.as_slice()))
    }

    /// Known versions of `path`, lowest first.
    pub fn versions(&self, path: &str) -> Vec<&str> {
        let mut versions: Vec<&str> = self
            .requirements
            .keys()
            .chain(self.failures.keys())
            .filter(|m| m.path == path)
            .map(|m| m.version.as_str())
            .collect();
        versions.sort_by(|a, b| self.order.cmp_versions(path, a, b));
        versions.dedup();
        versions
    }

    /// How many times `required` was called for `module`.
    pub fn fetch_count(&self, module: &ModuleVersion) -> usize {
        self.fetches
            .lock()
            .map(|f| f.get(module).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of `required` calls.
    pub fn total_fetches(&self) -> usize {
        self.total.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl RequirementProvider for RequirementTable {
    async fn required(&self, module: &ModuleVersion) -> Result<Vec<ModuleVersion>, ProviderError> {
        self.total.fetch_add(1, AtomicOrdering::SeqCst);
        if let Ok(mut fetches) = self.fetches.lock() {
            *fetches.entry(module.clone()).or_insert(0) += 1;
        }

        if let Some(message) = self.failures.get(module) {
            return Err(ProviderError::Fetch {
                module: module.clone(),
                message: message.clone(),
            });
        }
        self.requirements
            .get(module)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                module: module.clone(),
            })
    }

    async fn upgrade(&self, module: &ModuleVersion) -> Result<ModuleVersion, ProviderError> {
        let latest = self.versions(&module.path).last().copied();
        let newer = |v: &str| {
            self.order.cmp_versions(&module.path, v, &module.version) == Ordering::Greater
        };
        match latest {
            Some(v) if newer(v) => Ok(ModuleVersion::new(module.path.clone(), v)),
            _ => Ok(module.clone()),
        }
    }

    async fn previous(&self, module: &ModuleVersion) -> Result<ModuleVersion, ProviderError> {
        let previous = self
            .versions(&module.path)
            .into_iter()
            .rev()
            .find(|v| self.order.cmp_versions(&module.path, v, &module.version) == Ordering::Less);
        Ok(match previous {
            Some(v) => ModuleVersion::new(module.path.clone(), v),
            None => ModuleVersion::none(module.path.clone()),
        })
    }

    fn pruning(&self, module: &ModuleVersion) -> Pruning {
        if self.pruned.contains(module) {
            Pruning::Pruned
        } else {
            Pruning::Unpruned
        }
    }
}
