//! The MVS algorithms: build list, minimal roots, upgrade and downgrade.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use mvs_core::config::{FetchPolicy, ResolverConfig};
use mvs_core::{ModuleVersion, ProviderError, Pruning, RequirementProvider, VersionOrder};
use tokio_util::sync::CancellationToken;

use crate::cache::ProviderCache;
use crate::engine::{self, LoadRequest, Resolution, UpgradePlan};
use crate::error::ResolveError;
use crate::graph::RequirementGraph;

/// Runs resolutions against one provider.
///
/// All resolutions share a [`ProviderCache`], so each module version is
/// fetched at most once over the resolver's lifetime.
#[derive(Clone)]
pub struct Resolver {
    cache: ProviderCache,
    config: ResolverConfig,
    cancel: CancellationToken,
}

impl Resolver {
    pub fn new(provider: Arc<dyn RequirementProvider>, order: Arc<dyn VersionOrder>) -> Self {
        Self {
            cache: ProviderCache::new(provider, order),
            config: ResolverConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind every traversal to `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProviderCache {
        &self.cache
    }

    pub fn order(&self) -> &Arc<dyn VersionOrder> {
        self.cache.order()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// A request over `roots` using the configured fetch policy and pruning.
    pub fn request(&self, roots: Vec<ModuleVersion>) -> LoadRequest {
        LoadRequest::new(roots)
            .with_fetch(self.config.fetch)
            .with_pruning(self.config.pruning)
    }

    /// Run one traversal.
    pub async fn resolve(&self, request: LoadRequest) -> Result<Resolution, ResolveError> {
        engine::load(&self.cache, request, self.config.jobs, &self.cancel).await
    }

    /// The build list for `targets`: the targets first, then the selected
    /// version of every other path, sorted by path.
    pub async fn build_list(
        &self,
        targets: &[ModuleVersion],
    ) -> Result<Vec<ModuleVersion>, ResolveError> {
        self.resolve(self.request(targets.to_vec()))
            .await?
            .into_build_list()
    }

    /// The smallest set of requirements for `main` whose build list equals
    /// the build list of `main`. Paths in `base` are always listed. Sorted
    /// by path; `main` itself is not included.
    pub async fn req(
        &self,
        main: &ModuleVersion,
        base: &[String],
    ) -> Result<Vec<ModuleVersion>, ResolveError> {
        // Every version in the closure must be known, not only the winners.
        let request = LoadRequest::new(vec![main.clone()])
            .with_fetch(FetchPolicy::All)
            .with_pruning(Pruning::Unpruned);
        let resolution = self.resolve(request).await?;
        if let Some(err) = resolution.error {
            return Err(err.into());
        }
        Ok(minimal_requirements(&resolution.graph, main, base))
    }

    /// The build list for `target` with every module moved to the version
    /// its provider upgrades it to.
    pub async fn upgrade_all(
        &self,
        target: &ModuleVersion,
    ) -> Result<Vec<ModuleVersion>, ResolveError> {
        let keep = HashSet::from([target.path.clone()]);
        let request = self
            .request(vec![target.clone()])
            .with_upgrade(UpgradePlan::Latest { keep });
        self.resolve(request).await?.into_build_list()
    }

    /// The build list for `target` with each of `extras` selected at least
    /// at its given version. Other modules only move as far as the extras'
    /// own requirements force them.
    pub async fn upgrade(
        &self,
        target: &ModuleVersion,
        extras: &[ModuleVersion],
    ) -> Result<Vec<ModuleVersion>, ResolveError> {
        let mut list = self.cancellable(self.cache.required(target)).await?.to_vec();
        let mut in_list: HashSet<String> = list.iter().map(|m| m.path.clone()).collect();
        let mut upgrade_to: BTreeMap<String, String> = BTreeMap::new();
        for u in extras.iter().filter(|u| u.path != target.path) {
            if in_list.insert(u.path.clone()) {
                list.push(ModuleVersion::none(u.path.clone()));
            }
            let v = match upgrade_to.get(&u.path) {
                Some(prev) => self.order().max_version(&u.path, prev, &u.version).to_string(),
                None => u.version.clone(),
            };
            upgrade_to.insert(u.path.clone(), v);
        }
        tracing::debug!("Upgrading {target} with {} extra modules", upgrade_to.len());

        let request = self
            .request(vec![target.clone()])
            .with_override(target.clone(), list)
            .with_upgrade(UpgradePlan::To(upgrade_to));
        self.resolve(request).await?.into_build_list()
    }

    /// The build list for `target` with each of `extras` selected at most
    /// at its given version (or removed). Modules whose requirements would
    /// push an extra back up are themselves moved to earlier versions.
    pub async fn downgrade(
        &self,
        target: &ModuleVersion,
        extras: &[ModuleVersion],
    ) -> Result<Vec<ModuleVersion>, ResolveError> {
        let order = self.order().clone();
        let full = self.build_list(std::slice::from_ref(target)).await?;
        let list: Vec<ModuleVersion> = full.into_iter().filter(|m| m.path != target.path).collect();

        let mut max: HashMap<String, String> = list
            .iter()
            .map(|m| (m.path.clone(), m.version.clone()))
            .collect();
        for d in extras.iter().filter(|d| d.path != target.path) {
            let lower = match max.get(&d.path) {
                Some(v) => order.max_version(&d.path, v, &d.version) != d.version,
                None => true,
            };
            if lower {
                max.insert(d.path.clone(), d.version.clone());
            }
        }

        let mut walk = Downgrade::new(order.clone(), max);
        self.learn(&mut walk, list.clone()).await?;

        let mut downgraded: Vec<ModuleVersion> = Vec::with_capacity(list.len());
        'list: for r in &list {
            let mut r = r.clone();
            walk.add(&r);
            while walk.is_excluded(&r) {
                let mut p = self.cancellable(self.cache.previous(&r)).await?;
                // A ceiling that previous never enumerates still gets tried.
                if let Some(v) = walk.max.get(&r.path) {
                    if order.max_version(&r.path, v, &r.version) != v.as_str()
                        && order.max_version(&r.path, &p.version, v) != p.version
                    {
                        p.version = v.clone();
                    }
                }
                if p.is_none() {
                    tracing::debug!("Dropping {} from the build list", r.path);
                    continue 'list;
                }
                tracing::trace!("Trying {p} instead of {r}");
                self.learn(&mut walk, vec![p.clone()]).await?;
                walk.add(&p);
                r = p;
            }
            downgraded.push(r);
        }

        // Previous may skip versions that other modules still select, so
        // recompute with the versions actually chosen.
        let request = self
            .request(vec![target.clone()])
            .with_override(target.clone(), downgraded);
        let actual = self.resolve(request).await?.into_build_list()?;
        let actual: HashMap<String, String> =
            actual.into_iter().map(|m| (m.path, m.version)).collect();
        let settled: Vec<ModuleVersion> = list
            .iter()
            .filter_map(|m| {
                actual
                    .get(&m.path)
                    .map(|v| ModuleVersion::new(m.path.clone(), v.clone()))
            })
            .collect();

        let request = self
            .request(vec![target.clone()])
            .with_override(target.clone(), settled);
        self.resolve(request).await?.into_build_list()
    }

    /// Await a provider call made outside a traversal, giving up as soon as
    /// the resolver is cancelled.
    async fn cancellable<T>(
        &self,
        call: impl Future<Output = Result<T, Arc<ProviderError>>>,
    ) -> Result<T, ResolveError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ResolveError::Cancelled),
            answer = call => answer.map_err(ResolveError::Provider),
        }
    }

    /// Load the requirement closure of `roots` into the downgrade index.
    async fn learn(
        &self,
        walk: &mut Downgrade,
        roots: Vec<ModuleVersion>,
    ) -> Result<(), ResolveError> {
        let roots: Vec<ModuleVersion> = roots
            .into_iter()
            .filter(|m| !walk.reqs.contains_key(m))
            .collect();
        if roots.is_empty() {
            return Ok(());
        }
        let request = LoadRequest::new(roots)
            .with_fetch(FetchPolicy::All)
            .with_pruning(Pruning::Unpruned);
        let resolution = self.resolve(request).await?;
        let graph = &resolution.graph;
        graph.walk_breadth_first(|m| {
            if walk.reqs.contains_key(m) {
                return;
            }
            let reqs = if resolution.failures.contains_key(m) {
                None
            } else {
                graph.required_by(m)
            };
            walk.reqs.insert(m.clone(), reqs);
        });
        Ok(())
    }
}

/// Bookkeeping for [`Resolver::downgrade`]: which module versions were
/// tried and which are ruled out because something they require exceeds
/// its ceiling.
struct Downgrade {
    order: Arc<dyn VersionOrder>,
    max: HashMap<String, String>,
    /// Requirements of every module version seen; `None` if loading failed.
    reqs: HashMap<ModuleVersion, Option<Vec<ModuleVersion>>>,
    added: HashSet<ModuleVersion>,
    rdeps: HashMap<ModuleVersion, Vec<ModuleVersion>>,
    excluded: HashSet<ModuleVersion>,
}

impl Downgrade {
    fn new(order: Arc<dyn VersionOrder>, max: HashMap<String, String>) -> Self {
        Self {
            order,
            max,
            reqs: HashMap::new(),
            added: HashSet::new(),
            rdeps: HashMap::new(),
            excluded: HashSet::new(),
        }
    }

    fn is_excluded(&self, m: &ModuleVersion) -> bool {
        self.excluded.contains(m)
    }

    fn exclude(&mut self, m: &ModuleVersion) {
        if !self.excluded.insert(m.clone()) {
            return;
        }
        let parents = self.rdeps.get(m).cloned().unwrap_or_default();
        for p in &parents {
            self.exclude(p);
        }
    }

    fn add(&mut self, m: &ModuleVersion) {
        if !self.added.insert(m.clone()) {
            return;
        }
        if let Some(v) = self.max.get(&m.path) {
            if self.order.max_version(&m.path, &m.version, v) != v.as_str() {
                // Above the ceiling for its path.
                self.exclude(m);
                return;
            }
        }
        let Some(Some(list)) = self.reqs.get(m).cloned() else {
            self.exclude(m);
            return;
        };
        for r in &list {
            self.add(r);
            if self.excluded.contains(r) {
                self.exclude(m);
                return;
            }
            self.rdeps.entry(r.clone()).or_default().push(m.clone());
        }
    }
}

/// Reverse postorder over the requirement closure of `main`'s build list,
/// keeping only modules not already implied by earlier picks.
fn minimal_requirements(
    graph: &RequirementGraph,
    main: &ModuleVersion,
    base: &[String],
) -> Vec<ModuleVersion> {
    let list = graph.build_list();
    let reqs_of = |m: &ModuleVersion| -> Vec<ModuleVersion> {
        if m == main {
            return Vec::new();
        }
        graph.required_by(m).unwrap_or_default()
    };

    fn postorder(
        m: &ModuleVersion,
        reqs_of: &dyn Fn(&ModuleVersion) -> Vec<ModuleVersion>,
        seen: &mut HashSet<ModuleVersion>,
        out: &mut Vec<ModuleVersion>,
    ) {
        if !seen.insert(m.clone()) {
            return;
        }
        for r in reqs_of(m) {
            postorder(&r, reqs_of, seen, out);
        }
        out.push(m.clone());
    }

    fn mark(
        m: &ModuleVersion,
        reqs_of: &dyn Fn(&ModuleVersion) -> Vec<ModuleVersion>,
        have: &mut HashSet<ModuleVersion>,
    ) {
        if !have.insert(m.clone()) {
            return;
        }
        for r in reqs_of(m) {
            mark(&r, reqs_of, have);
        }
    }

    let mut order: Vec<ModuleVersion> = Vec::new();
    let mut seen: HashSet<ModuleVersion> = HashSet::from([main.clone()]);
    for m in &list {
        postorder(m, &reqs_of, &mut seen, &mut order);
    }

    let max: HashMap<&str, &str> = list
        .iter()
        .map(|m| (m.path.as_str(), m.version.as_str()))
        .collect();

    let mut have: HashSet<ModuleVersion> = HashSet::new();
    let mut min: Vec<ModuleVersion> = Vec::new();
    let mut have_base: HashSet<&str> = HashSet::new();
    for path in base {
        if path == &main.path || !have_base.insert(path.as_str()) {
            continue;
        }
        let Some(v) = max.get(path.as_str()) else {
            continue;
        };
        let m = ModuleVersion::new(path.clone(), *v);
        mark(&m, &reqs_of, &mut have);
        min.push(m);
    }
    for m in order.iter().rev() {
        if max.get(m.path.as_str()) != Some(&m.version.as_str()) {
            continue;
        }
        if !have.contains(m) {
            mark(m, &reqs_of, &mut have);
            min.push(m.clone());
        }
    }
    min.sort_by(|a, b| a.path.cmp(&b.path));
    min
}
