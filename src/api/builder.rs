use std::{
    env,
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use home::home_dir;
use log::{debug, warn};

use crate::{
    cache::{FileCacheStore, KeyedLocks},
    chain::RepositoryChain,
    config::ArtifetchConfig,
    format::{FormatRegistry, PatternLayout, DEFAULT_ARTIFACT_PATTERN, DEFAULT_DESCRIPTOR_PATTERN},
    model::repositories::RepositoriesFile,
    policy::ResolutionPolicy,
    repository::{ExternalRepository, RepositoryPort},
    transport::{FileTransport, TimeoutTransport},
    Artifetch,
};

const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Default)]
pub struct ArtifetchBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    repositories_file_name: Option<PathBuf>,
    cache_directory_path: Option<PathBuf>,
    offline: Option<bool>,
    refresh_dependencies: Option<bool>,
    jobs: Option<usize>,
    transport_timeout: Option<Duration>,
    formats: Option<FormatRegistry>,
}

impl ArtifetchBuilder {
    /// Project root directory.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Name of the file declaring the repositories.
    ///
    /// Defaults to `artifetch.toml`.
    pub fn repositories_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.repositories_file_name = Some(path.into());
        self
    }

    /// Location of the artifetch cache directory.
    ///
    /// Defaults to `ARTIFETCH_CACHE_DIR`, then `$HOME/.artifetch/cache`.
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory_path = Some(path.into());
        self
    }

    /// Resolve from the cache only. Takes precedence over refreshing.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = Some(offline);
        self
    }

    /// Treat every cached entry as stale.
    pub fn refresh_dependencies(mut self, refresh: bool) -> Self {
        self.refresh_dependencies = Some(refresh);
        self
    }

    /// Number of modules resolved in parallel.
    ///
    /// Defaults to the available parallelism.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Upper bound for a single transport call. Defaults to one minute.
    pub fn transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = Some(timeout);
        self
    }

    /// Repository formats available to `artifetch.toml`. Defaults to the built-in formats.
    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Some(formats);
        self
    }

    pub fn try_build(self) -> Result<Artifetch, Box<dyn Error>> {
        let Self {
            root,
            repositories_file_name,
            cache_directory_path,
            offline,
            refresh_dependencies,
            jobs,
            transport_timeout,
            formats,
        } = self;
        let config = ArtifetchConfig::load()?;

        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let repositories_file_name =
            repositories_file_name.unwrap_or_else(|| PathBuf::from("artifetch.toml"));

        let cache_directory = match cache_directory_path.or(config.cache_dir) {
            Some(path) => root.join(path),
            None => default_cache_directory()?,
        };

        let policy = ResolutionPolicy::new(
            offline.unwrap_or(config.offline),
            refresh_dependencies.unwrap_or(config.refresh),
            config.rules,
        );
        debug!("Resolution mode: {:?}", policy.mode());

        let cache = Arc::new(FileCacheStore::new(cache_directory)?);

        let repositories = load_repositories(&root.join(repositories_file_name))?;
        let formats = formats.unwrap_or_else(FormatRegistry::with_defaults);
        let timeout = transport_timeout.unwrap_or(DEFAULT_TRANSPORT_TIMEOUT);
        let locks = Arc::new(KeyedLocks::new());

        let ports = repositories
            .repositories
            .into_iter()
            .map(|definition| {
                let layout = PatternLayout::new(
                    definition
                        .descriptor_pattern
                        .unwrap_or_else(|| DEFAULT_DESCRIPTOR_PATTERN.to_owned()),
                    definition
                        .artifact_pattern
                        .unwrap_or_else(|| DEFAULT_ARTIFACT_PATTERN.to_owned()),
                );
                let format = formats.create(&definition.format, layout)?;
                let transport = TimeoutTransport::new(
                    Arc::new(FileTransport::new(root.join(&definition.url))),
                    timeout,
                );
                let port = ExternalRepository::new(
                    definition.name,
                    format,
                    cache.clone(),
                    Arc::new(transport),
                    policy.cache_rules(),
                    locks.clone(),
                )
                .into_port();
                Ok(policy.override_repository(port))
            })
            .collect::<Result<Vec<RepositoryPort>, crate::model::ParseError>>()?;

        let jobs = match jobs {
            Some(jobs) => jobs,
            None => std::thread::available_parallelism().map_or(4, usize::from),
        };

        Ok(Artifetch {
            chain: RepositoryChain::new(ports),
            cache,
            policy,
            jobs,
        })
    }
}

fn load_repositories(path: &Path) -> Result<RepositoriesFile, Box<dyn Error>> {
    if path.exists() {
        Ok(RepositoriesFile::from_file(path)?)
    } else {
        warn!(
            "{} does not exist, no repositories are configured",
            path.display()
        );
        Ok(RepositoriesFile::default())
    }
}

fn default_cache_directory() -> Result<PathBuf, Box<dyn Error>> {
    let mut cache_directory =
        home_dir().ok_or("Could not find home dir. Please define $HOME env variable.")?;
    cache_directory.push(".artifetch/cache");
    Ok(cache_directory)
}
