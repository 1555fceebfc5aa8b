use std::{collections::BTreeSet, fmt::Display, sync::Arc};

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use super::{RepositoryAccess, RepositoryPort};
use crate::{
    cache::{CacheError, CacheKey, CacheStore, KeyedLocks},
    format::{FormatAdapter, ParseContext},
    model::{
        ArtifactCategory, ArtifactDescriptor, LocatedArtifact, ModuleCoordinate, ModuleMetadata,
        ModuleSelector, ParseError, Version,
    },
    policy::{CacheCategory, CacheRules},
    result::{Operation, ResolveError, ResolveResult},
    transport::{FetchOutcome, Transport, TransportError},
};

/// A repository reached through a transport, with a write-through local cache.
pub struct ExternalRepository {
    name: String,
    format: Arc<dyn FormatAdapter>,
    cache: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    rules: CacheRules,
    locks: Arc<KeyedLocks>,
}

/// Outcome of an optional-artifact probe as stored in the cache.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactSetRecord {
    artifacts: Vec<RecordedArtifact>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordedArtifact {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    extension: String,
    classifier: Option<String>,
}

impl ArtifactSetRecord {
    fn new(artifacts: &BTreeSet<ArtifactDescriptor>) -> ArtifactSetRecord {
        ArtifactSetRecord {
            artifacts: artifacts
                .iter()
                .map(|artifact| RecordedArtifact {
                    name: artifact.name.clone(),
                    kind: artifact.kind.clone(),
                    extension: artifact.extension.clone(),
                    classifier: artifact.classifier.clone(),
                })
                .collect(),
        }
    }

    fn from_bytes(bytes: &[u8]) -> Result<ArtifactSetRecord, ParseError> {
        Ok(toml::from_str(std::str::from_utf8(bytes)?)?)
    }

    fn into_artifacts(self, module: &ModuleCoordinate) -> BTreeSet<ArtifactDescriptor> {
        self.artifacts
            .into_iter()
            .map(|artifact| {
                ArtifactDescriptor::new(
                    module.clone(),
                    artifact.name,
                    artifact.kind,
                    artifact.extension,
                    artifact.classifier,
                )
            })
            .collect()
    }
}

impl ExternalRepository {
    pub fn new(
        name: impl Into<String>,
        format: Arc<dyn FormatAdapter>,
        cache: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
        rules: CacheRules,
        locks: Arc<KeyedLocks>,
    ) -> ExternalRepository {
        ExternalRepository {
            name: name.into(),
            format,
            cache,
            transport,
            rules,
            locks,
        }
    }

    pub fn into_port(self) -> RepositoryPort {
        let shared = Arc::new(self);
        RepositoryPort::new(
            shared.name.clone(),
            Arc::new(LocalAccess(shared.clone())),
            Arc::new(RemoteAccess(shared)),
        )
    }

    /// Cached bytes for `key`, or `None` when absent or older than the category allows.
    fn read_fresh(
        &self,
        key: &CacheKey,
        category: CacheCategory,
    ) -> Result<Option<Vec<u8>>, CacheError> {
        let policy = self.rules.policy(category);
        match self.cache.entry_age(key)? {
            None => {
                trace!("No cached entry {}", key.as_str());
                Ok(None)
            }
            Some(age) if !policy.is_fresh(age) => {
                debug!(
                    "Cached entry {} is stale ({}s old, trusted for {})",
                    key.as_str(),
                    age.as_secs(),
                    policy
                );
                Ok(None)
            }
            Some(_) => self.cache.read_entry(key),
        }
    }

    fn cached_artifact(
        &self,
        key: &CacheKey,
        artifact: &ArtifactDescriptor,
    ) -> Result<Option<LocatedArtifact>, CacheError> {
        Ok(self
            .cache
            .entry_age(key)?
            .filter(|age| self.rules.is_fresh(CacheCategory::Artifact, *age))
            .map(|_| LocatedArtifact {
                artifact: artifact.clone(),
                path: self.cache.entry_path(key),
            }))
    }

    fn write_through(&self, key: &CacheKey, bytes: &[u8]) {
        match self.cache.write_entry(key, bytes) {
            Ok(()) => trace!("Cached {}", key.as_str()),
            Err(error) => warn!("Could not cache {}: {}", key.as_str(), error),
        }
    }

    fn record_artifact_set(&self, key: &CacheKey, artifacts: &BTreeSet<ArtifactDescriptor>) {
        match toml::to_string(&ArtifactSetRecord::new(artifacts)) {
            Ok(text) => self.write_through(key, text.as_bytes()),
            Err(error) => warn!("Could not record {}: {}", key.as_str(), error),
        }
    }

    fn context<'a>(&'a self, requested: &'a ModuleCoordinate) -> ParseContext<'a> {
        ParseContext {
            repository: &self.name,
            requested,
        }
    }

    fn cache_failure(&self, subject: impl Display, source: CacheError) -> ResolveError {
        ResolveError::Cache {
            subject: subject.to_string(),
            repository: self.name.clone(),
            source,
        }
    }

    fn parse_failure(&self, subject: impl Display, source: ParseError) -> ResolveError {
        ResolveError::Parse {
            subject: subject.to_string(),
            repository: self.name.clone(),
            source,
        }
    }

    fn transport_failure(
        &self,
        operation: Operation,
        subject: impl Display,
        source: TransportError,
    ) -> ResolveError {
        ResolveError::Transport {
            operation,
            subject: subject.to_string(),
            repository: self.name.clone(),
            source,
        }
    }

    fn read_cached<T>(
        &self,
        key: &CacheKey,
        category: CacheCategory,
        subject: impl Display,
        parse: impl FnOnce(&[u8]) -> Result<T, ParseError>,
    ) -> ResolveResult<T> {
        let mut result = ResolveResult::new();
        match self.read_fresh(key, category) {
            Ok(Some(bytes)) => match parse(&bytes) {
                Ok(value) => {
                    debug!("Using cached {} from {}", subject, self.name);
                    result.resolved(value);
                }
                Err(error) => result.failed(self.parse_failure(subject, error)),
            },
            Ok(None) => {}
            Err(error) => result.failed(self.cache_failure(subject, error)),
        }
        result
    }

    fn fetch_and_parse<T>(
        &self,
        operation: Operation,
        key: &CacheKey,
        category: CacheCategory,
        location: &str,
        subject: impl Display,
        parse: impl Fn(&[u8]) -> Result<T, ParseError>,
    ) -> ResolveResult<T> {
        self.locks.with_lock(key, || {
            let mut result = ResolveResult::new();
            // Another worker may have fetched it while this one waited for the lock.
            if let Ok(Some(bytes)) = self.read_fresh(key, category) {
                if let Ok(value) = parse(&bytes) {
                    trace!("{} was fetched concurrently", subject);
                    result.resolved(value);
                    return result;
                }
            }
            debug!("Fetching {} from {} ({})", subject, self.name, location);
            match self.transport.fetch(location) {
                Ok(FetchOutcome::Found(bytes)) => match parse(&bytes) {
                    Ok(value) => {
                        self.write_through(key, &bytes);
                        result.resolved(value);
                    }
                    Err(error) => result.failed(self.parse_failure(subject, error)),
                },
                Ok(FetchOutcome::NotFound) => {
                    debug!("{} does not exist in {}", subject, self.name);
                    result.missing();
                }
                Err(error) => result.failed(self.transport_failure(operation, subject, error)),
            }
            result
        })
    }
}

struct LocalAccess(Arc<ExternalRepository>);

impl RepositoryAccess for LocalAccess {
    fn list_module_versions(&self, selector: &ModuleSelector) -> ResolveResult<BTreeSet<Version>> {
        let repository = &self.0;
        repository.read_cached(
            &CacheKey::version_listing(&repository.name, selector),
            CacheCategory::Dependency,
            format_args!("version listing of {}:{}", selector.group, selector.name),
            |bytes| repository.format.parse_version_listing(bytes),
        )
    }

    fn resolve_component_metadata(
        &self,
        coordinate: &ModuleCoordinate,
    ) -> ResolveResult<ModuleMetadata> {
        let repository = &self.0;
        repository.read_cached(
            &CacheKey::descriptor(&repository.name, coordinate),
            CacheCategory::Module,
            coordinate,
            |bytes| {
                repository
                    .format
                    .parse_metadata(bytes, &repository.context(coordinate))
            },
        )
    }

    fn resolve_module_artifacts(
        &self,
        module: &ModuleMetadata,
        category: &ArtifactCategory,
    ) -> ResolveResult<BTreeSet<ArtifactDescriptor>> {
        let repository = &self.0;
        let declared = module.configuration_artifacts(category.configuration_name());
        match (category, declared) {
            (_, Some(artifacts)) => ResolveResult::from_resolved(artifacts),
            (ArtifactCategory::Configuration(name), None) => {
                ResolveResult::from_failure(ResolveError::UnknownConfiguration {
                    module: module.coordinate.clone(),
                    configuration: name.clone(),
                })
            }
            (_, None) => repository.read_cached(
                &CacheKey::artifact_set(&repository.name, &module.coordinate, category),
                CacheCategory::Artifact,
                format_args!("{} of {}", category, module.coordinate),
                |bytes| {
                    ArtifactSetRecord::from_bytes(bytes)
                        .map(|record| record.into_artifacts(&module.coordinate))
                },
            ),
        }
    }

    fn resolve_artifact(&self, artifact: &ArtifactDescriptor) -> ResolveResult<LocatedArtifact> {
        let repository = &self.0;
        let key = CacheKey::artifact(&repository.name, artifact);
        let mut result = ResolveResult::new();
        match repository.cached_artifact(&key, artifact) {
            Ok(Some(located)) => {
                debug!("Using cached {} from {}", artifact, repository.name);
                result.resolved(located);
            }
            Ok(None) => {}
            Err(error) => result.failed(repository.cache_failure(artifact, error)),
        }
        result
    }
}

struct RemoteAccess(Arc<ExternalRepository>);

impl RepositoryAccess for RemoteAccess {
    fn list_module_versions(&self, selector: &ModuleSelector) -> ResolveResult<BTreeSet<Version>> {
        let repository = &self.0;
        repository.fetch_and_parse(
            Operation::ListModuleVersions,
            &CacheKey::version_listing(&repository.name, selector),
            CacheCategory::Dependency,
            &repository.format.version_listing_location(selector),
            format_args!("version listing of {}:{}", selector.group, selector.name),
            |bytes| repository.format.parse_version_listing(bytes),
        )
    }

    fn resolve_component_metadata(
        &self,
        coordinate: &ModuleCoordinate,
    ) -> ResolveResult<ModuleMetadata> {
        let repository = &self.0;
        repository.fetch_and_parse(
            Operation::ResolveComponentMetadata,
            &CacheKey::descriptor(&repository.name, coordinate),
            CacheCategory::Module,
            &repository.format.descriptor_location(coordinate),
            coordinate,
            |bytes| {
                repository
                    .format
                    .parse_metadata(bytes, &repository.context(coordinate))
            },
        )
    }

    fn resolve_module_artifacts(
        &self,
        module: &ModuleMetadata,
        category: &ArtifactCategory,
    ) -> ResolveResult<BTreeSet<ArtifactDescriptor>> {
        let repository = &self.0;
        // Configuration artifacts come from metadata, so only companions are probed.
        let Some(candidate) = category.probe_candidate(&module.coordinate, &module.extension)
        else {
            return ResolveResult::new();
        };
        let key = CacheKey::artifact_set(&repository.name, &module.coordinate, category);
        let location = repository.format.artifact_location(&candidate);

        repository.locks.with_lock(&key, || {
            let mut result = ResolveResult::new();
            // Another worker may have probed it while this one waited for the lock.
            if let Ok(Some(bytes)) = repository.read_fresh(&key, CacheCategory::Artifact) {
                if let Ok(record) = ArtifactSetRecord::from_bytes(&bytes) {
                    trace!("{} of {} was probed concurrently", category, module.coordinate);
                    result.resolved(record.into_artifacts(&module.coordinate));
                    return result;
                }
            }
            debug!("Probing {} in {}", location, repository.name);
            match repository.transport.probe_exists(&location) {
                Ok(exists) => {
                    let artifacts = if exists {
                        debug!("Found {} for {}", category, module.coordinate);
                        BTreeSet::from([candidate])
                    } else {
                        debug!("No {} published for {}", category, module.coordinate);
                        BTreeSet::new()
                    };
                    repository.record_artifact_set(&key, &artifacts);
                    result.resolved(artifacts);
                }
                Err(error) => result.failed(repository.transport_failure(
                    Operation::ResolveModuleArtifacts,
                    format_args!("{} of {}", category, module.coordinate),
                    error,
                )),
            }
            result
        })
    }

    fn resolve_artifact(&self, artifact: &ArtifactDescriptor) -> ResolveResult<LocatedArtifact> {
        let repository = &self.0;
        let key = CacheKey::artifact(&repository.name, artifact);
        let location = repository.format.artifact_location(artifact);

        repository.locks.with_lock(&key, || {
            let mut result = ResolveResult::new();
            // Another worker may have downloaded it while this one waited for the lock.
            match repository.cached_artifact(&key, artifact) {
                Ok(Some(located)) => {
                    result.resolved(located);
                    return result;
                }
                Ok(None) => {}
                Err(error) => warn!("Ignoring unreadable cache entry for {}: {}", artifact, error),
            }

            match repository.transport.fetch(&location) {
                Ok(FetchOutcome::Found(bytes)) => match repository.cache.write_entry(&key, &bytes) {
                    Ok(()) => {
                        info!("Downloaded {} from {}", artifact, repository.name);
                        result.resolved(LocatedArtifact {
                            artifact: artifact.clone(),
                            path: repository.cache.entry_path(&key),
                        });
                    }
                    Err(error) => result.failed(repository.cache_failure(artifact, error)),
                },
                Ok(FetchOutcome::NotFound) => {
                    debug!("{} does not exist in {}", artifact, repository.name);
                    result.missing();
                }
                Err(error) => result.failed(repository.transport_failure(
                    Operation::ResolveArtifact,
                    artifact,
                    error,
                )),
            }
            result
        })
    }
}
