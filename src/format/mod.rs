use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use crate::model::{
    ArtifactDescriptor, ModuleCoordinate, ModuleMetadata, ModuleSelector, ParseError, Version,
};

mod descriptor;
mod layout;

pub use descriptor::TomlDescriptorFormat;
pub use layout::{PatternLayout, DEFAULT_ARTIFACT_PATTERN, DEFAULT_DESCRIPTOR_PATTERN};

/// What the parser knows about the request that produced a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub repository: &'a str,
    pub requested: &'a ModuleCoordinate,
}

/// One repository wire format: where things live and how descriptors read.
pub trait FormatAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn descriptor_location(&self, module: &ModuleCoordinate) -> String;

    fn version_listing_location(&self, selector: &ModuleSelector) -> String;

    fn artifact_location(&self, artifact: &ArtifactDescriptor) -> String;

    fn parse_metadata(
        &self,
        bytes: &[u8],
        context: &ParseContext<'_>,
    ) -> Result<ModuleMetadata, ParseError>;

    fn parse_version_listing(&self, bytes: &[u8]) -> Result<BTreeSet<Version>, ParseError>;
}

type FormatFactory = dyn Fn(PatternLayout) -> Arc<dyn FormatAdapter> + Send + Sync;

/// Formats known by name, each instantiated per repository with that repository's layout.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    factories: HashMap<String, Arc<FormatFactory>>,
}

impl FormatRegistry {
    pub fn with_defaults() -> FormatRegistry {
        let mut registry = FormatRegistry::default();
        registry.register(TomlDescriptorFormat::NAME, |layout| {
            Arc::new(TomlDescriptorFormat::new(layout))
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(PatternLayout) -> Arc<dyn FormatAdapter> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn create(
        &self,
        name: &str,
        layout: PatternLayout,
    ) -> Result<Arc<dyn FormatAdapter>, ParseError> {
        self.factories
            .get(name)
            .map(|factory| factory(layout))
            .ok_or_else(|| ParseError::UnknownFormat(name.to_owned()))
    }
}
