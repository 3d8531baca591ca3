//! Concurrent frontier traversal that fills a [`RequirementGraph`].
//!
//! Fetches run as tasks in a [`JoinSet`], bounded by a semaphore. Only the
//! loop in [`load`] touches the graph: it registers each finished fetch and
//! schedules the module's requirements, so the graph has a single writer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use mvs_core::config::FetchPolicy;
use mvs_core::{ModuleVersion, ProviderError, Pruning};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::cache::ProviderCache;
use crate::error::{BuildListError, ResolveError};
use crate::graph::RequirementGraph;

/// How each loaded module version may be replaced by a newer one. An
/// upgrade `m -> u` is recorded as an extra first requirement of `m`.
#[derive(Debug, Clone, Default)]
pub enum UpgradePlan {
    #[default]
    None,
    /// Ask the provider for every module except those on the listed paths.
    Latest { keep: HashSet<String> },
    /// Move every version of a listed path to the given version.
    To(BTreeMap<String, String>),
}

/// Everything a traversal needs besides the provider.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    /// Dominant starting points.
    pub roots: Vec<ModuleVersion>,
    /// Requirement lists used instead of asking the provider.
    pub overrides: HashMap<ModuleVersion, Vec<ModuleVersion>>,
    pub upgrade: UpgradePlan,
    pub fetch: FetchPolicy,
    pub pruning: Pruning,
}

impl LoadRequest {
    pub fn new(roots: Vec<ModuleVersion>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    pub fn with_override(mut self, module: ModuleVersion, reqs: Vec<ModuleVersion>) -> Self {
        self.overrides.insert(module, reqs);
        self
    }

    pub fn with_upgrade(mut self, upgrade: UpgradePlan) -> Self {
        self.upgrade = upgrade;
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

/// A finished traversal: the graph plus whatever went wrong on the way.
pub struct Resolution {
    pub graph: RequirementGraph,
    /// The first failing module reachable from the roots, with its chain.
    pub error: Option<BuildListError>,
    /// Every failed module version.
    pub failures: BTreeMap<ModuleVersion, Arc<ProviderError>>,
    /// Upgrade edges `from -> to` taken during the traversal.
    pub upgrades: HashMap<ModuleVersion, ModuleVersion>,
}

impl Resolution {
    /// The build list, best effort even when `error` is set.
    pub fn build_list(&self) -> Vec<ModuleVersion> {
        self.graph.build_list()
    }

    /// The build list, or the load error if there was one.
    pub fn into_build_list(self) -> Result<Vec<ModuleVersion>, ResolveError> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.graph.build_list()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mode {
    /// A root: requirements are loaded and expanded under the request's
    /// pruning mode.
    Root,
    /// Reached from a root of a pruned graph: a module that itself prunes
    /// has its requirements recorded but not expanded.
    Pruned,
    /// Everything below is loaded.
    Unpruned,
}

struct Loaded {
    module: ModuleVersion,
    mode: Mode,
    edges: Edges,
    upgrade: Option<ModuleVersion>,
}

struct Shared {
    cache: ProviderCache,
    overrides: HashMap<ModuleVersion, Vec<ModuleVersion>>,
    upgrade: UpgradePlan,
}

type Edges = Result<Vec<ModuleVersion>, Arc<ProviderError>>;

async fn fetch(shared: &Shared, m: &ModuleVersion) -> (Edges, Option<ModuleVersion>) {
    let mut edges = if let Some(reqs) = shared.overrides.get(m) {
        Ok(reqs.clone())
    } else if m.is_none() {
        Ok(Vec::new())
    } else {
        shared.cache.required(m).await.map(|reqs| reqs.to_vec())
    };

    let target = match &shared.upgrade {
        UpgradePlan::None => Ok(None),
        UpgradePlan::Latest { keep } => {
            if keep.contains(&m.path) || m.is_none() {
                Ok(None)
            } else {
                shared.cache.upgrade(m).await.map(Some)
            }
        }
        UpgradePlan::To(versions) => Ok(versions
            .get(&m.path)
            .map(|v| ModuleVersion::new(m.path.clone(), v.clone()))),
    };

    let upgrade = match target {
        Ok(u) => u.filter(|u| u != m),
        Err(err) => {
            if edges.is_ok() {
                edges = Err(err);
            }
            None
        }
    };
    if let (Ok(list), Some(u)) = (&mut edges, &upgrade) {
        list.insert(0, u.clone());
    }
    (edges, upgrade)
}

/// Traverse the requirement graph from `request.roots`.
///
/// Provider failures do not stop the traversal: a failed module is
/// registered with no requirements and reported in the result. Only
/// cancellation yields an error, and then no partial graph is returned.
pub async fn load(
    cache: &ProviderCache,
    request: LoadRequest,
    jobs: usize,
    cancel: &CancellationToken,
) -> Result<Resolution, ResolveError> {
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }
    let LoadRequest {
        roots,
        overrides,
        upgrade,
        fetch: policy,
        pruning,
    } = request;

    let shared = Arc::new(Shared {
        cache: cache.clone(),
        overrides,
        upgrade,
    });
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut graph = RequirementGraph::new(cache.order().clone(), roots.clone());
    let mut failures: BTreeMap<ModuleVersion, Arc<ProviderError>> = BTreeMap::new();
    let mut upgrades: HashMap<ModuleVersion, ModuleVersion> = HashMap::new();
    let mut scheduled: HashSet<(ModuleVersion, Mode)> = HashSet::new();
    let mut join_set: JoinSet<Loaded> = JoinSet::new();

    let mut schedule = |join_set: &mut JoinSet<Loaded>, module: ModuleVersion, mode: Mode| {
        if !scheduled.insert((module.clone(), mode)) {
            return;
        }
        tracing::trace!("Scheduling {module} ({mode:?})");
        let shared = shared.clone();
        let sem = semaphore.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            let (edges, upgrade) = fetch(&shared, &module).await;
            Loaded {
                module,
                mode,
                edges,
                upgrade,
            }
        });
    };

    for root in &roots {
        schedule(&mut join_set, root.clone(), Mode::Root);
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                tracing::debug!("Traversal cancelled with {} fetches in flight", join_set.len());
                return Err(ResolveError::Cancelled);
            }
            next = join_set.join_next() => next,
        };
        let Some(joined) = next else {
            break;
        };
        let loaded = match joined {
            Ok(loaded) => loaded,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => return Err(ResolveError::Cancelled),
        };

        let Loaded {
            module,
            mode,
            edges,
            upgrade,
        } = loaded;

        if !graph.is_registered(&module) {
            let reqs = match edges {
                Ok(reqs) => reqs,
                Err(err) => {
                    failures.insert(module.clone(), err);
                    Vec::new()
                }
            };
            if let Some(u) = upgrade {
                upgrades.insert(module.clone(), u);
            }
            tracing::debug!("Registering {module} with {} requirements", reqs.len());
            graph.require(&module, &reqs);
        }

        let child_mode = match (mode, pruning) {
            (Mode::Root, Pruning::Unpruned) | (Mode::Unpruned, _) => Mode::Unpruned,
            (Mode::Root, _) => Mode::Pruned,
            (Mode::Pruned, _) => {
                if cache.pruning(&module) != Pruning::Unpruned {
                    continue;
                }
                Mode::Unpruned
            }
        };
        let children = graph.required_by(&module).unwrap_or_default();
        for child in children {
            if policy == FetchPolicy::SelectedOnly
                && !child.is_none()
                && graph.selected(&child.path) != child.version
            {
                tracing::trace!("Skipping {child}: {} is selected", graph.selected(&child.path));
                continue;
            }
            schedule(&mut join_set, child, child_mode);
        }
    }

    let error = if failures.is_empty() {
        None
    } else {
        let path = graph
            .find_path(|m| failures.contains_key(m))
            .or_else(|| failures.keys().next().map(|m| vec![m.clone()]))
            .unwrap_or_default();
        path.last()
            .and_then(|m| failures.get(m))
            .map(|err| {
                BuildListError::new(path.clone(), err.clone(), |from, to| {
                    upgrades.get(from) == Some(to)
                })
            })
    };

    tracing::info!(
        "Loaded {} module versions ({} paths selected, {} failed)",
        graph.len(),
        graph.build_list().len(),
        failures.len()
    );

    Ok(Resolution {
        graph,
        error,
        failures,
        upgrades,
    })
}
