//! Per-key memoization of provider calls.
//!
//! Each key owns a [`OnceCell`]: the first caller runs the provider, every
//! concurrent caller for the same key waits on the same cell, and later
//! callers get the stored answer. Failures are memoized too. If the task
//! running a fetch is aborted the cell stays empty and the next caller
//! retries.

use std::cmp::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use mvs_core::{ModuleVersion, ProviderError, Pruning, RequirementProvider, VersionOrder};
use tokio::sync::OnceCell;

type Answer<T> = Result<T, Arc<ProviderError>>;
type Slot<T> = Arc<OnceCell<Answer<T>>>;

/// A validating, memoizing front for a [`RequirementProvider`].
///
/// Cloning is cheap; clones share the memoized answers.
#[derive(Clone)]
pub struct ProviderCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    provider: Arc<dyn RequirementProvider>,
    order: Arc<dyn VersionOrder>,
    required: DashMap<ModuleVersion, Slot<Arc<[ModuleVersion]>>>,
    upgrade: DashMap<ModuleVersion, Slot<ModuleVersion>>,
    previous: DashMap<ModuleVersion, Slot<ModuleVersion>>,
}

fn inconsistent(module: &ModuleVersion, message: String) -> Arc<ProviderError> {
    Arc::new(ProviderError::Inconsistent {
        module: module.clone(),
        message,
    })
}

impl ProviderCache {
    pub fn new(provider: Arc<dyn RequirementProvider>, order: Arc<dyn VersionOrder>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                provider,
                order,
                required: DashMap::new(),
                upgrade: DashMap::new(),
                previous: DashMap::new(),
            }),
        }
    }

    pub fn provider(&self) -> &Arc<dyn RequirementProvider> {
        &self.inner.provider
    }

    pub fn order(&self) -> &Arc<dyn VersionOrder> {
        &self.inner.order
    }

    /// The direct requirements of `m`, fetched at most once.
    pub async fn required(&self, m: &ModuleVersion) -> Answer<Arc<[ModuleVersion]>> {
        let cell = self.inner.required.entry(m.clone()).or_default().clone();
        cell.get_or_init(|| async {
            tracing::debug!("Fetching requirements of {m}");
            let reqs = self.inner.provider.required(m).await.map_err(|e| {
                tracing::warn!("Failed to load requirements of {m}: {e}");
                Arc::new(e)
            })?;
            for r in &reqs {
                if r.path.is_empty() {
                    return Err(inconsistent(m, format!("requirement `{r}` has an empty path")));
                }
                if r.is_none() {
                    return Err(inconsistent(m, format!("requirement `{r}` names no version")));
                }
            }
            Ok(Arc::from(reqs))
        })
        .await
        .clone()
    }

    /// The version `m` upgrades to, fetched at most once.
    pub async fn upgrade(&self, m: &ModuleVersion) -> Answer<ModuleVersion> {
        let cell = self.inner.upgrade.entry(m.clone()).or_default().clone();
        cell.get_or_init(|| async {
            tracing::debug!("Querying upgrade for {m}");
            let u = self.inner.provider.upgrade(m).await.map_err(Arc::new)?;
            if u.path != m.path {
                return Err(inconsistent(m, format!("upgrade answered `{u}` for another path")));
            }
            Ok(u)
        })
        .await
        .clone()
    }

    /// The next lower version of `m.path`, fetched at most once. Always
    /// strictly below `m`; `"none"` answers for itself.
    pub async fn previous(&self, m: &ModuleVersion) -> Answer<ModuleVersion> {
        if m.is_none() {
            return Ok(m.clone());
        }
        let cell = self.inner.previous.entry(m.clone()).or_default().clone();
        cell.get_or_init(|| async {
            tracing::debug!("Querying previous version of {m}");
            let p = self.inner.provider.previous(m).await.map_err(Arc::new)?;
            if p.path != m.path {
                return Err(inconsistent(m, format!("previous answered `{p}` for another path")));
            }
            if self.inner.order.cmp_versions(&m.path, &p.version, &m.version) != Ordering::Less {
                return Err(inconsistent(m, format!("previous answered `{p}`, which is not lower")));
            }
            Ok(p)
        })
        .await
        .clone()
    }

    pub fn pruning(&self, m: &ModuleVersion) -> Pruning {
        self.inner.provider.pruning(m)
    }

    /// Number of distinct modules whose requirements were asked for.
    pub fn required_len(&self) -> usize {
        self.inner.required.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mvs_core::order::SemverOrder;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RequirementProvider for Counting {
        async fn required(&self, m: &ModuleVersion) -> Result<Vec<ModuleVersion>, ProviderError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            tokio::task::yield_now().await;
            match m.path.as_str() {
                "bad" => Ok(vec![ModuleVersion::none("x")]),
                "gone" => Err(ProviderError::NotFound { module: m.clone() }),
                _ => Ok(vec![ModuleVersion::new("leaf", "1")]),
            }
        }

        async fn upgrade(&self, m: &ModuleVersion) -> Result<ModuleVersion, ProviderError> {
            Ok(ModuleVersion::new("other", m.version.clone()))
        }

        async fn previous(&self, m: &ModuleVersion) -> Result<ModuleVersion, ProviderError> {
            Ok(ModuleVersion::new(m.path.clone(), "9"))
        }
    }

    fn cache(provider: Arc<Counting>) -> ProviderCache {
        ProviderCache::new(provider, Arc::new(SemverOrder))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_fetch() {
        let provider = Arc::new(Counting::default());
        let cache = cache(provider.clone());
        let m = ModuleVersion::new("a", "1");
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let m = m.clone();
            handles.push(tokio::spawn(async move { cache.required(&m).await }));
        }
        for h in handles {
            let reqs = h.await.unwrap().unwrap();
            assert_eq!(&reqs[..], &[ModuleVersion::new("leaf", "1")]);
        }
        assert_eq!(provider.calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(cache.required_len(), 1);
    }

    #[tokio::test]
    async fn failures_are_memoized() {
        let provider = Arc::new(Counting::default());
        let cache = cache(provider.clone());
        let m = ModuleVersion::new("gone", "1");
        assert!(cache.required(&m).await.is_err());
        assert!(cache.required(&m).await.is_err());
        assert_eq!(provider.calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_none_requirements() {
        let cache = cache(Arc::new(Counting::default()));
        let err = cache.required(&ModuleVersion::new("bad", "1")).await.unwrap_err();
        assert!(matches!(*err, ProviderError::Inconsistent { .. }));
    }

    #[tokio::test]
    async fn rejects_answers_for_other_paths_or_higher_versions() {
        let cache = cache(Arc::new(Counting::default()));
        let m = ModuleVersion::new("a", "1");
        let err = cache.upgrade(&m).await.unwrap_err();
        assert!(matches!(*err, ProviderError::Inconsistent { .. }));
        let err = cache.previous(&m).await.unwrap_err();
        assert!(err.to_string().contains("not lower"));
        let none = ModuleVersion::none("a");
        assert_eq!(cache.previous(&none).await.unwrap(), none);
    }
}
