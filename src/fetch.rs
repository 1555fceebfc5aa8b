use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use log::{debug, info, warn};
use thiserror::Error;
use tokio::{
    sync::{AcquireError, Semaphore},
    task::{JoinError, JoinSet},
};

use crate::{
    chain::RepositoryChain,
    model::{ArtifactCategory, ArtifactDescriptor, LocatedArtifact, ModuleMetadata, ModuleSelector},
    result::{ResolveError, ResolveResult},
};

pub const DEFAULT_CONFIGURATION: &str = "default";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Resolution worker failed: {0}")]
    Worker(#[from] JoinError),
    #[error("Worker pool closed unexpectedly: {0}")]
    Closed(#[from] AcquireError),
    #[error("Interrupted")]
    Interrupted,
}

/// What to resolve for every requested module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub configuration: String,
    pub sources: bool,
    pub javadoc: bool,
    /// Download every resolved artifact into the cache.
    pub download: bool,
}

impl Default for ResolveRequest {
    fn default() -> Self {
        ResolveRequest {
            configuration: DEFAULT_CONFIGURATION.to_owned(),
            sources: false,
            javadoc: false,
            download: false,
        }
    }
}

impl ResolveRequest {
    fn categories(&self) -> Vec<ArtifactCategory> {
        let mut categories = vec![ArtifactCategory::Configuration(self.configuration.clone())];
        if self.sources {
            categories.push(ArtifactCategory::Sources);
        }
        if self.javadoc {
            categories.push(ArtifactCategory::Documentation);
        }
        categories
    }
}

/// Everything resolved for one selector.
#[derive(Debug)]
pub struct ModuleReport {
    pub selector: ModuleSelector,
    pub metadata: ResolveResult<ModuleMetadata>,
    pub artifacts: BTreeMap<ArtifactCategory, ResolveResult<BTreeSet<ArtifactDescriptor>>>,
    pub downloads: Vec<(ArtifactDescriptor, ResolveResult<LocatedArtifact>)>,
}

impl ModuleReport {
    /// The module resolved, no artifact set failed and every download succeeded.
    pub fn is_success(&self) -> bool {
        self.metadata.is_resolved()
            && self.artifacts.values().all(|artifacts| !artifacts.is_failed())
            && self
                .downloads
                .iter()
                .all(|(_, download)| download.is_resolved())
    }

    pub fn failures(&self) -> Vec<&ResolveError> {
        self.metadata
            .failure()
            .into_iter()
            .chain(self.artifacts.values().filter_map(ResolveResult::failure))
            .chain(
                self.downloads
                    .iter()
                    .filter_map(|(_, download)| download.failure()),
            )
            .collect()
    }
}

/// Resolves one selector: its metadata, the requested artifact sets and optionally their content.
pub fn resolve_module(
    chain: &RepositoryChain,
    selector: ModuleSelector,
    request: &ResolveRequest,
) -> ModuleReport {
    info!("Resolving {}", selector);
    let metadata = chain.resolve_selector(&selector);
    let mut artifacts = BTreeMap::new();
    let mut downloads = Vec::new();

    if let Some(module) = metadata.value() {
        for category in request.categories() {
            let resolved = chain.resolve_module_artifacts(module, &category);
            if request.download {
                for artifact in resolved.value().into_iter().flatten() {
                    downloads.push((artifact.clone(), chain.resolve_artifact(artifact)));
                }
            }
            artifacts.insert(category, resolved);
        }
    } else if metadata.is_missing() {
        warn!("{} was not found in any repository", selector);
    }

    ModuleReport {
        selector,
        metadata,
        artifacts,
        downloads,
    }
}

/// Resolves independent selectors in parallel. Reports come back in input order.
pub fn resolve_modules(
    chain: &RepositoryChain,
    selectors: Vec<ModuleSelector>,
    request: &ResolveRequest,
    jobs: usize,
) -> Result<Vec<ModuleReport>, FetchError> {
    let chain = chain.clone();
    let request = request.clone();
    run_parallel(selectors, jobs, move |selector| {
        resolve_module(&chain, selector, &request)
    })
}

/// Runs blocking `work` over `items` with at most `jobs` items in flight.
pub fn run_parallel<I, T, F>(items: Vec<I>, jobs: usize, work: F) -> Result<Vec<T>, FetchError>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> T + Send + Sync + 'static,
{
    let jobs = jobs.max(1);
    debug!("Running {} task(s) on {} worker(s)", items.len(), jobs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async move {
        let semaphore = Arc::new(Semaphore::new(jobs));
        let work = Arc::new(work);
        let count = items.len();
        let mut tasks = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await?;
            let work = work.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (index, work(item))
            });
        }

        let mut results = Vec::with_capacity(count);
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(joined) => results.push(joined?),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    tasks.abort_all();
                    return Err(FetchError::Interrupted);
                }
            }
        }
        results.sort_by_key(|(index, _)| *index);
        Ok::<_, FetchError>(results.into_iter().map(|(_, result)| result).collect())
    });

    if matches!(outcome, Err(FetchError::Interrupted)) {
        // Blocking workers cannot be cancelled, do not wait for them.
        runtime.shutdown_background();
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::Duration,
    };

    use super::*;
    use crate::{
        model::ModuleCoordinate,
        policy::ResolutionPolicy,
        testing::{CacheFixture, MemoryTransport},
    };

    use pretty_assertions::assert_eq;

    #[test]
    fn results_keep_input_order() {
        let delays = vec![30u64, 0, 20, 10];
        let results = run_parallel(delays.clone(), 4, |delay| {
            thread::sleep(Duration::from_millis(delay));
            delay
        })
        .unwrap();
        assert_eq!(results, delays);
    }

    #[test]
    fn concurrency_is_bounded_by_jobs() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (worker_active, worker_peak) = (active.clone(), peak.clone());
        run_parallel((0..12).collect(), 3, move |_: i32| {
            let now = worker_active.fetch_add(1, Ordering::SeqCst) + 1;
            worker_peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            worker_active.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn resolve_modules_reports_every_selector() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        let module = ModuleCoordinate::new("g", "lib", "1.0");
        transport.publish_module(&module);
        transport.publish_sources(&module);
        let chain = RepositoryChain::new(vec![fixture.repository(
            "central",
            transport,
            &ResolutionPolicy::default(),
        )]);
        let request = ResolveRequest {
            sources: true,
            download: true,
            ..Default::default()
        };

        let reports = resolve_modules(
            &chain,
            vec![module.clone().into(), "g:absent:1.0".parse().unwrap()],
            &request,
            2,
        )
        .unwrap();

        assert_eq!(reports.len(), 2);
        let found = &reports[0];
        assert!(found.is_success(), "{:?}", found.failures());
        assert_eq!(
            found.artifacts[&ArtifactCategory::Sources]
                .value()
                .map(BTreeSet::len),
            Some(1)
        );
        assert_eq!(found.downloads.len(), 2);

        let absent = &reports[1];
        assert!(absent.metadata.is_missing());
        assert!(!absent.is_success());
        assert!(absent.artifacts.is_empty());
    }
}
