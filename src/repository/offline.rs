use std::collections::BTreeSet;

use log::debug;

use super::RepositoryAccess;
use crate::{
    model::{
        ArtifactCategory, ArtifactDescriptor, LocatedArtifact, ModuleCoordinate, ModuleMetadata,
        ModuleSelector, Version,
    },
    result::{Operation, ResolveError, ResolveResult},
};

/// Remote half used in offline mode. Fails every request without any I/O.
pub struct OfflineRemoteAccess;

fn unavailable<T>(operation: Operation, subject: &dyn std::fmt::Display) -> ResolveResult<T> {
    debug!("Skipping {} of {} (offline)", operation, subject);
    let mut result = ResolveResult::new();
    result.failed(ResolveError::offline(operation, subject));
    result
}

impl RepositoryAccess for OfflineRemoteAccess {
    fn list_module_versions(&self, selector: &ModuleSelector) -> ResolveResult<BTreeSet<Version>> {
        unavailable(Operation::ListModuleVersions, selector)
    }

    fn resolve_component_metadata(
        &self,
        coordinate: &ModuleCoordinate,
    ) -> ResolveResult<ModuleMetadata> {
        unavailable(Operation::ResolveComponentMetadata, coordinate)
    }

    fn resolve_module_artifacts(
        &self,
        module: &ModuleMetadata,
        _category: &ArtifactCategory,
    ) -> ResolveResult<BTreeSet<ArtifactDescriptor>> {
        unavailable(Operation::ResolveModuleArtifacts, &module.coordinate)
    }

    fn resolve_artifact(&self, artifact: &ArtifactDescriptor) -> ResolveResult<LocatedArtifact> {
        unavailable(Operation::ResolveArtifact, artifact)
    }
}
