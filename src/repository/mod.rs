use std::{collections::BTreeSet, sync::Arc};

use crate::{
    model::{
        ArtifactCategory, ArtifactDescriptor, LocatedArtifact, ModuleCoordinate, ModuleMetadata,
        ModuleSelector, Version,
    },
    result::ResolveResult,
};

mod external;
mod offline;

pub use external::ExternalRepository;
pub use offline::OfflineRemoteAccess;

/// One half (local or remote) of a repository.
///
/// An unset result means this half has no answer and the caller should try
/// elsewhere.
pub trait RepositoryAccess: Send + Sync {
    fn list_module_versions(&self, selector: &ModuleSelector) -> ResolveResult<BTreeSet<Version>>;

    fn resolve_component_metadata(
        &self,
        coordinate: &ModuleCoordinate,
    ) -> ResolveResult<ModuleMetadata>;

    fn resolve_module_artifacts(
        &self,
        module: &ModuleMetadata,
        category: &ArtifactCategory,
    ) -> ResolveResult<BTreeSet<ArtifactDescriptor>>;

    fn resolve_artifact(&self, artifact: &ArtifactDescriptor) -> ResolveResult<LocatedArtifact>;
}

/// A configured repository: a cache-only half and a network half.
#[derive(Clone)]
pub struct RepositoryPort {
    name: String,
    local: Arc<dyn RepositoryAccess>,
    remote: Arc<dyn RepositoryAccess>,
}

impl RepositoryPort {
    pub fn new(
        name: impl Into<String>,
        local: Arc<dyn RepositoryAccess>,
        remote: Arc<dyn RepositoryAccess>,
    ) -> RepositoryPort {
        RepositoryPort {
            name: name.into(),
            local,
            remote,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Never performs network I/O.
    pub fn local_access(&self) -> &dyn RepositoryAccess {
        self.local.as_ref()
    }

    pub fn remote_access(&self) -> &dyn RepositoryAccess {
        self.remote.as_ref()
    }

    /// Same local half, with every remote operation failing as unavailable offline.
    pub fn offline(self) -> RepositoryPort {
        RepositoryPort {
            name: self.name,
            local: self.local,
            remote: Arc::new(OfflineRemoteAccess),
        }
    }
}
