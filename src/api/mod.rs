use std::{collections::BTreeSet, error::Error, sync::Arc};

use crate::{
    cache::FileCacheStore,
    chain::RepositoryChain,
    cli::command_handlers::{do_clear_cache, do_resolve},
    fetch::{ModuleReport, ResolveRequest},
    model::{ModuleSelector, Version},
    policy::ResolutionPolicy,
    result::ResolveResult,
};

mod builder;

pub use builder::ArtifetchBuilder;

pub struct Artifetch {
    chain: RepositoryChain,
    cache: Arc<FileCacheStore>,
    policy: ResolutionPolicy,
    jobs: usize,
}

impl Artifetch {
    pub fn builder() -> ArtifetchBuilder {
        ArtifetchBuilder::default()
    }

    /// Resolves every selector and the artifacts the request asks for
    pub fn resolve(
        &self,
        selectors: Vec<ModuleSelector>,
        request: &ResolveRequest,
    ) -> Result<Vec<ModuleReport>, Box<dyn Error>> {
        do_resolve(&self.chain, selectors, request, self.jobs)
    }

    /// Lists the versions of a module known to the first repository that answers
    pub fn versions(&self, selector: &ModuleSelector) -> ResolveResult<BTreeSet<Version>> {
        self.chain.list_module_versions(selector)
    }

    pub fn clear_cache(&self) -> Result<(), Box<dyn Error>> {
        do_clear_cache(self.cache.as_ref())
    }

    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    pub fn chain(&self) -> &RepositoryChain {
        &self.chain
    }
}
