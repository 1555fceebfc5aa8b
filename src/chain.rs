use std::{collections::BTreeSet, fmt::Display};

use log::{debug, trace};

use crate::{
    model::{
        ArtifactCategory, ArtifactDescriptor, LocatedArtifact, ModuleCoordinate, ModuleMetadata,
        ModuleSelector, Version,
    },
    repository::{RepositoryAccess, RepositoryPort},
    result::{Operation, RepositoryFailure, Resolution, ResolveError, ResolveResult},
};

#[derive(Debug, Clone, Copy)]
enum Phase {
    Local,
    Remote,
}

impl Phase {
    fn access(self, repository: &RepositoryPort) -> &dyn RepositoryAccess {
        match self {
            Phase::Local => repository.local_access(),
            Phase::Remote => repository.remote_access(),
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Local => "local",
            Phase::Remote => "remote",
        })
    }
}

/// Repositories in resolution order.
///
/// Every lookup first asks the local half of each repository, then the remote
/// half of each repository. The first resolved answer wins and suppresses the
/// failures seen before it. When nothing resolves, the lookup is missing if no
/// repository failed, and otherwise fails with every repository failure.
#[derive(Clone, Default)]
pub struct RepositoryChain {
    repositories: Vec<RepositoryPort>,
}

impl RepositoryChain {
    pub fn new(repositories: Vec<RepositoryPort>) -> RepositoryChain {
        RepositoryChain { repositories }
    }

    pub fn repositories(&self) -> &[RepositoryPort] {
        &self.repositories
    }

    pub fn list_module_versions(&self, selector: &ModuleSelector) -> ResolveResult<BTreeSet<Version>> {
        self.resolve(
            Operation::ListModuleVersions,
            &format_args!("{}:{}", selector.group, selector.name),
            |access| access.list_module_versions(selector),
        )
    }

    pub fn resolve_component_metadata(
        &self,
        coordinate: &ModuleCoordinate,
    ) -> ResolveResult<ModuleMetadata> {
        self.resolve(Operation::ResolveComponentMetadata, coordinate, |access| {
            access.resolve_component_metadata(coordinate)
        })
    }

    pub fn resolve_module_artifacts(
        &self,
        module: &ModuleMetadata,
        category: &ArtifactCategory,
    ) -> ResolveResult<BTreeSet<ArtifactDescriptor>> {
        self.resolve(
            Operation::ResolveModuleArtifacts,
            &format_args!("{} of {}", category, module.coordinate),
            |access| access.resolve_module_artifacts(module, category),
        )
    }

    pub fn resolve_artifact(&self, artifact: &ArtifactDescriptor) -> ResolveResult<LocatedArtifact> {
        self.resolve(Operation::ResolveArtifact, artifact, |access| {
            access.resolve_artifact(artifact)
        })
    }

    /// Resolves the metadata of the version a selector stands for.
    ///
    /// Dynamic constraints pick the highest listed version they accept.
    pub fn resolve_selector(&self, selector: &ModuleSelector) -> ResolveResult<ModuleMetadata> {
        if let Some(coordinate) = selector.as_coordinate() {
            return self.resolve_component_metadata(&coordinate);
        }

        match self.list_module_versions(selector).into_resolution() {
            Some(Resolution::Resolved(versions)) => match selector.constraint.select(&versions) {
                Some(version) => {
                    debug!("Selected version {} for {}", version.as_str(), selector);
                    self.resolve_component_metadata(&selector.with_version(version))
                }
                None => {
                    debug!("No listed version of {} matches", selector);
                    ResolveResult::from_missing()
                }
            },
            Some(Resolution::Failed(error)) => ResolveResult::from_failure(error),
            Some(Resolution::Missing) | None => ResolveResult::from_missing(),
        }
    }

    fn resolve<T>(
        &self,
        operation: Operation,
        subject: &dyn Display,
        lookup: impl Fn(&dyn RepositoryAccess) -> ResolveResult<T>,
    ) -> ResolveResult<T> {
        let mut failures = Vec::new();
        for phase in [Phase::Local, Phase::Remote] {
            for repository in &self.repositories {
                match lookup(phase.access(repository)).into_resolution() {
                    Some(Resolution::Resolved(value)) => {
                        trace!(
                            "{} resolved by {} access of {}",
                            subject,
                            phase,
                            repository.name()
                        );
                        if !failures.is_empty() {
                            debug!(
                                "Discarding {} earlier failure(s) for {}",
                                failures.len(),
                                subject
                            );
                        }
                        return ResolveResult::from_resolved(value);
                    }
                    Some(Resolution::Failed(error)) => {
                        debug!(
                            "{} access of {} failed for {}: {}",
                            phase,
                            repository.name(),
                            subject,
                            error
                        );
                        failures.push(RepositoryFailure {
                            repository: repository.name().to_owned(),
                            error,
                        });
                    }
                    Some(Resolution::Missing) => {
                        trace!("{} is missing from {}", subject, repository.name());
                    }
                    None => {}
                }
            }
        }

        if failures.is_empty() {
            ResolveResult::from_missing()
        } else {
            ResolveResult::from_failure(ResolveError::Exhausted {
                operation,
                subject: subject.to_string(),
                failures,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cache::{CacheKey, CacheStore},
        model::VersionConstraint,
        policy::{CacheRules, ResolutionPolicy},
        testing::{descriptor_location, CacheFixture, MemoryTransport, TransportCall},
    };

    use pretty_assertions::assert_eq;

    fn module() -> ModuleCoordinate {
        ModuleCoordinate::new("g", "lib", "1.0")
    }

    fn offline() -> ResolutionPolicy {
        ResolutionPolicy::new(true, false, CacheRules::default())
    }

    fn refresh() -> ResolutionPolicy {
        ResolutionPolicy::new(false, true, CacheRules::default())
    }

    fn chain(
        fixture: &CacheFixture,
        policy: &ResolutionPolicy,
        transports: &[(&str, &Arc<MemoryTransport>)],
    ) -> RepositoryChain {
        RepositoryChain::new(
            transports
                .iter()
                .map(|(name, transport)| fixture.repository(name, (*transport).clone(), policy))
                .collect(),
        )
    }

    fn resolved_metadata(chain: &RepositoryChain) -> ModuleMetadata {
        match chain.resolve_component_metadata(&module()).into_resolution() {
            Some(Resolution::Resolved(metadata)) => metadata,
            other => panic!("expected resolved metadata, got {other:?}"),
        }
    }

    #[test]
    fn offline_never_touches_the_transport() {
        let fixture = CacheFixture::new();
        let a = MemoryTransport::new();
        let b = MemoryTransport::new();
        a.publish_module(&module());
        a.publish_sources(&module());
        a.publish_versions("g", "lib", &["1.0"]);
        let chain = chain(&fixture, &offline(), &[("a", &a), ("b", &b)]);

        let selector = ModuleSelector::new("g", "lib", VersionConstraint::Latest);
        assert!(chain.list_module_versions(&selector).is_failed());
        assert!(chain.resolve_selector(&selector).is_failed());
        let metadata = chain.resolve_component_metadata(&module());
        assert!(metadata.failure().unwrap().is_offline());
        let sources = chain.resolve_module_artifacts(
            &ModuleMetadata::new(module()),
            &ArtifactCategory::Sources,
        );
        assert!(sources.failure().unwrap().is_offline());
        let jar = ArtifactDescriptor::new(module(), "lib", "jar", "jar", None);
        assert!(chain.resolve_artifact(&jar).failure().unwrap().is_offline());

        assert_eq!(a.call_count() + b.call_count(), 0);
    }

    #[test]
    fn offline_metadata_failure_names_operation_and_module() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        transport.publish_module(&module());
        let chain = chain(&fixture, &offline(), &[("central", &transport)]);

        let result = chain.resolve_component_metadata(&module());
        let message = result.failure().unwrap().to_string();
        assert!(
            message.contains(
                "No cached version of g:lib:1.0 available for offline mode (resolve_component_metadata)"
            ),
            "{message}"
        );
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn offline_uses_the_cache_whatever_its_age() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        transport.publish_module(&module());
        resolved_metadata(&chain(&fixture, &refresh(), &[("central", &transport)]));

        let untouched = MemoryTransport::new();
        let chain = chain(&fixture, &offline(), &[("central", &untouched)]);
        assert_eq!(resolved_metadata(&chain).coordinate, module());
        assert_eq!(untouched.call_count(), 0);
    }

    #[test]
    fn fresh_cache_entries_skip_the_remote_side() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        transport.publish_module(&module());
        transport.publish_versions("g", "lib", &["1.0"]);
        let policy = ResolutionPolicy::default();
        let primed = chain(&fixture, &policy, &[("central", &transport)]);
        let selector = ModuleSelector::new("g", "lib", VersionConstraint::Latest);
        assert!(primed.resolve_selector(&selector).is_resolved());

        let unreachable = MemoryTransport::unreachable();
        let chain = chain(&fixture, &policy, &[("central", &unreachable)]);
        assert!(chain.resolve_selector(&selector).is_resolved());
        assert_eq!(unreachable.call_count(), 0);
    }

    #[test]
    fn refresh_always_asks_the_remote_side() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        transport.publish_module(&module());
        transport.publish_versions("g", "lib", &["1.0"]);
        let selector = ModuleSelector::new("g", "lib", VersionConstraint::Latest);
        let chain = chain(&fixture, &refresh(), &[("central", &transport)]);

        assert!(chain.resolve_selector(&selector).is_resolved());
        assert!(chain.resolve_selector(&selector).is_resolved());
        let listing = TransportCall::Fetch("g/lib/versions.toml".to_owned());
        let descriptor = TransportCall::Fetch(descriptor_location(&module()));
        assert_eq!(
            transport.calls(),
            vec![listing.clone(), descriptor.clone(), listing, descriptor]
        );
    }

    #[test]
    fn refresh_does_not_fall_back_to_stale_cache() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        transport.publish_module(&module());
        resolved_metadata(&chain(&fixture, &ResolutionPolicy::default(), &[("central", &transport)]));

        let unreachable = MemoryTransport::unreachable();
        let chain = chain(&fixture, &refresh(), &[("central", &unreachable)]);
        assert!(chain.resolve_component_metadata(&module()).is_failed());
        assert_eq!(unreachable.call_count(), 1);
    }

    #[test]
    fn absent_sources_resolve_to_an_empty_set() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        transport.publish_module(&module());
        let chain = chain(&fixture, &ResolutionPolicy::default(), &[("central", &transport)]);
        let metadata = resolved_metadata(&chain);

        let sources = chain.resolve_module_artifacts(&metadata, &ArtifactCategory::Sources);
        assert_eq!(sources.value(), Some(&BTreeSet::new()));
        assert!(!sources.is_failed());
    }

    #[test]
    fn later_repository_resolves_after_missing() {
        let fixture = CacheFixture::new();
        let a = MemoryTransport::new();
        let b = MemoryTransport::new();
        b.publish_module(&module());
        let chain = chain(&fixture, &ResolutionPolicy::default(), &[("a", &a), ("b", &b)]);

        let metadata = resolved_metadata(&chain);
        assert_eq!(metadata.coordinate, module());
        assert_eq!(
            a.calls(),
            vec![TransportCall::Fetch(descriptor_location(&module()))]
        );
        assert!(fixture
            .cache
            .read_entry(&CacheKey::descriptor("a", &module()))
            .unwrap()
            .is_none());
        assert!(fixture
            .cache
            .read_entry(&CacheKey::descriptor("b", &module()))
            .unwrap()
            .is_some());
    }

    #[test]
    fn missing_everywhere_is_missing() {
        let fixture = CacheFixture::new();
        let a = MemoryTransport::new();
        let b = MemoryTransport::new();
        let chain = chain(&fixture, &ResolutionPolicy::default(), &[("a", &a), ("b", &b)]);
        assert!(chain.resolve_component_metadata(&module()).is_missing());
        assert!(RepositoryChain::default()
            .resolve_component_metadata(&module())
            .is_missing());
    }

    #[test]
    fn parse_error_moves_on_to_the_next_repository() {
        let fixture = CacheFixture::new();
        let broken = MemoryTransport::new();
        broken.publish(&descriptor_location(&module()), "[module");
        let good = MemoryTransport::new();
        good.publish_module(&module());

        let both = chain(
            &fixture,
            &ResolutionPolicy::default(),
            &[("broken", &broken), ("good", &good)],
        );
        assert_eq!(resolved_metadata(&both).coordinate, module());

        let only_broken = chain(&fixture, &ResolutionPolicy::default(), &[("broken", &broken)]);
        match only_broken.resolve_component_metadata(&module()).failure() {
            Some(ResolveError::Exhausted { failures, .. }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].repository, "broken");
                assert!(matches!(failures[0].error, ResolveError::Parse { .. }));
            }
            other => panic!("expected exhausted chain, got {other:?}"),
        }
    }

    #[test]
    fn exhausted_chain_reports_every_repository() {
        let fixture = CacheFixture::new();
        let a = MemoryTransport::unreachable();
        let b = MemoryTransport::new();
        let c = MemoryTransport::unreachable();
        let chain = chain(
            &fixture,
            &ResolutionPolicy::default(),
            &[("a", &a), ("b", &b), ("c", &c)],
        );

        let result = chain.resolve_component_metadata(&module());
        let message = result.failure().unwrap().to_string();
        assert!(message.starts_with("Could not resolve metadata for g:lib:1.0:"));
        assert!(message.contains("\n  - a: "));
        assert!(!message.contains("\n  - b: "));
        assert!(message.contains("\n  - c: "));
    }

    #[test]
    fn first_repository_serves_metadata_and_sources_then_cache() {
        let fixture = CacheFixture::new();
        let a = MemoryTransport::new();
        a.publish_module(&module());
        a.publish_sources(&module());
        let b = MemoryTransport::unreachable();
        let chain = chain(
            &fixture,
            &ResolutionPolicy::default(),
            &[("repo-a", &a), ("repo-b", &b)],
        );

        let metadata = resolved_metadata(&chain);
        assert_eq!(metadata.configurations.len(), 1);
        let sources = chain.resolve_module_artifacts(&metadata, &ArtifactCategory::Sources);
        assert_eq!(sources.value().map(BTreeSet::len), Some(1));

        let calls = a.call_count() + b.call_count();
        assert_eq!(resolved_metadata(&chain), metadata);
        assert_eq!(a.call_count() + b.call_count(), calls);
        assert_eq!(b.call_count(), 0);
    }

    #[test]
    fn dynamic_selector_picks_highest_accepted_version() {
        let fixture = CacheFixture::new();
        let transport = MemoryTransport::new();
        for version in ["1.0", "1.2", "2.0"] {
            transport.publish_module(&ModuleCoordinate::new("g", "lib", version));
        }
        transport.publish_versions("g", "lib", &["1.0", "1.2", "2.0"]);
        let chain = chain(&fixture, &ResolutionPolicy::default(), &[("central", &transport)]);

        let prefix = "g:lib:1.+".parse::<ModuleSelector>().unwrap();
        let metadata = chain.resolve_selector(&prefix);
        assert_eq!(
            metadata.value().map(|metadata| metadata.coordinate.version.as_str()),
            Some("1.2")
        );

        let none = "g:lib:3.+".parse::<ModuleSelector>().unwrap();
        assert!(chain.resolve_selector(&none).is_missing());
    }
}
