//! Immutable requirement snapshots.
//!
//! A [`Requirements`] value never changes after construction; editing
//! produces a new one. Its [`ModuleGraph`] is loaded by the first reader and
//! shared with every later or concurrent reader, including a load failure.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

use mvs_core::{ModuleVersion, Pruning, VersionOrder};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::engine::Resolution;
use crate::error::{BuildListError, ResolveError};
use crate::graph::RequirementGraph;
use crate::resolver::Resolver;

/// A fully loaded, read-only requirement graph.
pub struct ModuleGraph {
    graph: RequirementGraph,
    error: Option<BuildListError>,
    build_list: OnceLock<Vec<ModuleVersion>>,
}

impl ModuleGraph {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            graph: resolution.graph,
            error: resolution.error,
            build_list: OnceLock::new(),
        }
    }

    /// The first load failure reachable from the main modules.
    pub fn error(&self) -> Option<&BuildListError> {
        self.error.as_ref()
    }

    pub fn graph(&self) -> &RequirementGraph {
        &self.graph
    }

    pub fn required_by(&self, m: &ModuleVersion) -> Option<Vec<ModuleVersion>> {
        self.graph.required_by(m)
    }

    pub fn selected(&self, path: &str) -> &str {
        self.graph.selected(path)
    }

    /// Main modules first, then every selected module sorted by path.
    pub fn build_list(&self) -> &[ModuleVersion] {
        self.build_list.get_or_init(|| self.graph.build_list())
    }

    pub fn walk_breadth_first(&self, f: impl FnMut(&ModuleVersion)) {
        self.graph.walk_breadth_first(f)
    }

    pub fn find_path(&self, pred: impl Fn(&ModuleVersion) -> bool) -> Option<Vec<ModuleVersion>> {
        self.graph.find_path(pred)
    }

    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        self.graph.print_tree(max_depth)
    }
}

/// The root requirements of one or more main modules.
pub struct Requirements {
    pruning: Pruning,
    order: Arc<dyn VersionOrder>,
    main_modules: Vec<ModuleVersion>,
    /// Sorted by path, then version. The same path may appear with several
    /// versions when it is required by different main modules.
    root_modules: Vec<ModuleVersion>,
    max_root_version: BTreeMap<String, String>,
    direct: BTreeSet<String>,
    graph: OnceCell<Arc<ModuleGraph>>,
}

/// What a lock-file writer persists: the roots and the direct paths, both
/// sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSummary {
    pub pruning: Pruning,
    pub roots: Vec<String>,
    pub direct: Vec<String>,
}

impl LockSummary {
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Requirements {
    /// Build a snapshot. Roots with version `"none"` are dropped; the rest
    /// are sorted.
    ///
    /// # Panics
    ///
    /// If a root names the path of a main module.
    pub fn new(
        pruning: Pruning,
        order: Arc<dyn VersionOrder>,
        main_modules: Vec<ModuleVersion>,
        root_modules: Vec<ModuleVersion>,
        direct: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut roots: Vec<ModuleVersion> =
            root_modules.into_iter().filter(|m| !m.is_none()).collect();
        for m in &roots {
            if main_modules.iter().any(|main| main.path == m.path) {
                panic!("requirements: root {m} names a main module");
            }
        }
        roots.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| order.cmp_versions(&a.path, &a.version, &b.version))
        });
        roots.dedup();

        let mut max_root_version: BTreeMap<String, String> = BTreeMap::new();
        for m in &roots {
            let v = match max_root_version.get(&m.path) {
                Some(prev) => order.max_version(&m.path, prev, &m.version).to_string(),
                None => m.version.clone(),
            };
            max_root_version.insert(m.path.clone(), v);
        }

        Self {
            pruning,
            order,
            main_modules,
            root_modules: roots,
            max_root_version,
            direct: direct.into_iter().collect(),
            graph: OnceCell::new(),
        }
    }

    /// A new snapshot with the same main modules and settings but different
    /// roots and direct paths.
    pub fn with_roots(
        &self,
        root_modules: Vec<ModuleVersion>,
        direct: impl IntoIterator<Item = String>,
    ) -> Self {
        Self::new(
            self.pruning,
            self.order.clone(),
            self.main_modules.clone(),
            root_modules,
            direct,
        )
    }

    pub fn pruning(&self) -> Pruning {
        self.pruning
    }

    pub fn order(&self) -> &Arc<dyn VersionOrder> {
        &self.order
    }

    pub fn main_modules(&self) -> &[ModuleVersion] {
        &self.main_modules
    }

    pub fn root_modules(&self) -> &[ModuleVersion] {
        &self.root_modules
    }

    pub fn is_main(&self, path: &str) -> bool {
        self.main_modules.iter().any(|m| m.path == path)
    }

    /// The highest root version of `path`, or the version of the main
    /// module with that path.
    pub fn root_selected(&self, path: &str) -> Option<&str> {
        if let Some(main) = self.main_modules.iter().find(|m| m.path == path) {
            return Some(main.version.as_str());
        }
        self.max_root_version.get(path).map(String::as_str)
    }

    pub fn is_direct(&self, path: &str) -> bool {
        self.direct.contains(path)
    }

    /// Directly required paths, sorted.
    pub fn direct_paths(&self) -> impl Iterator<Item = &str> {
        self.direct.iter().map(String::as_str)
    }

    pub fn lock_summary(&self) -> LockSummary {
        LockSummary {
            pruning: self.pruning,
            roots: self.root_modules.iter().map(ToString::to_string).collect(),
            direct: self.direct.iter().cloned().collect(),
        }
    }

    /// The loaded graph, even if some module failed to load. Loaded once;
    /// a cancelled load is not remembered and the next reader retries.
    pub async fn graph_best_effort(
        &self,
        resolver: &Resolver,
    ) -> Result<Arc<ModuleGraph>, ResolveError> {
        self.graph
            .get_or_try_init(|| async {
                let mut request = resolver
                    .request(self.main_modules.clone())
                    .with_pruning(self.pruning);
                for main in &self.main_modules {
                    request = request.with_override(main.clone(), self.root_modules.clone());
                }
                let resolution = resolver.resolve(request).await?;
                tracing::debug!(
                    "Loaded requirement graph for {} main modules and {} roots",
                    self.main_modules.len(),
                    self.root_modules.len()
                );
                Ok::<_, ResolveError>(Arc::new(ModuleGraph::new(resolution)))
            })
            .await
            .cloned()
    }

    /// The loaded graph, or the load failure shared by every reader.
    pub async fn graph(&self, resolver: &Resolver) -> Result<Arc<ModuleGraph>, ResolveError> {
        let graph = self.graph_best_effort(resolver).await?;
        match graph.error() {
            Some(err) => Err(err.clone().into()),
            None => Ok(graph),
        }
    }

    pub async fn build_list(
        &self,
        resolver: &Resolver,
    ) -> Result<Vec<ModuleVersion>, ResolveError> {
        Ok(self.graph(resolver).await?.build_list().to_vec())
    }

    pub async fn selected(&self, resolver: &Resolver, path: &str) -> Result<String, ResolveError> {
        Ok(self.graph(resolver).await?.selected(path).to_string())
    }
}
