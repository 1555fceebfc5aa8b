use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::Deserialize;

use super::{FormatAdapter, ParseContext, PatternLayout};
use crate::model::{
    metadata::{DEFAULT_EXTENSION, DEFAULT_STATUS},
    ArtifactDescriptor, Configuration, ModuleCoordinate, ModuleMetadata, ModuleSelector,
    ParseError, Version,
};

const DEFAULT_CONFIGURATION: &str = "default";

/// Module descriptors written in TOML:
///
/// ```toml
/// [module]
/// group = "org.example"
/// name = "lib"
/// version = "1.0"
///
/// [configurations.default]
/// dependencies = ["org.example:core:1.+"]
///
/// [[configurations.default.artifacts]]
/// name = "lib"
/// ```
pub struct TomlDescriptorFormat {
    layout: PatternLayout,
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    module: RawModule,
    #[serde(default)]
    configurations: BTreeMap<String, RawConfiguration>,
}

#[derive(Debug, Deserialize)]
struct RawModule {
    group: String,
    name: String,
    version: String,
    status: Option<String>,
    extension: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfiguration {
    description: Option<String>,
    visible: Option<bool>,
    transitive: Option<bool>,
    extends: Vec<String>,
    dependencies: Vec<ModuleSelector>,
    artifacts: Vec<RawArtifact>,
}

#[derive(Debug, Deserialize)]
struct RawArtifact {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    ext: Option<String>,
    classifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVersionListing {
    versions: Vec<Version>,
}

impl TomlDescriptorFormat {
    pub const NAME: &'static str = "toml";

    pub fn new(layout: PatternLayout) -> TomlDescriptorFormat {
        TomlDescriptorFormat { layout }
    }

    fn descriptor_artifact(module: &ModuleCoordinate) -> ArtifactDescriptor {
        ArtifactDescriptor::new(module.clone(), "module", "descriptor", "toml", None)
    }

    fn into_metadata(raw: RawDescriptor) -> Result<ModuleMetadata, ParseError> {
        let coordinate = ModuleCoordinate::new(raw.module.group, raw.module.name, raw.module.version);
        let extension = raw
            .module
            .extension
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_owned());

        let mut metadata = ModuleMetadata::new(coordinate.clone());
        metadata.status = raw
            .module
            .status
            .unwrap_or_else(|| DEFAULT_STATUS.to_owned());
        metadata.extension = extension.clone();

        let mut raw_configurations = raw.configurations;
        if raw_configurations.is_empty() {
            debug!(
                "{} declares no configurations, assuming a single default artifact",
                coordinate
            );
            raw_configurations.insert(
                DEFAULT_CONFIGURATION.to_owned(),
                RawConfiguration {
                    artifacts: vec![RawArtifact {
                        name: None,
                        kind: None,
                        ext: None,
                        classifier: None,
                    }],
                    ..Default::default()
                },
            );
        }

        for (name, raw) in raw_configurations {
            let artifacts = raw
                .artifacts
                .into_iter()
                .map(|artifact| {
                    let ext = artifact.ext.unwrap_or_else(|| extension.clone());
                    ArtifactDescriptor::new(
                        coordinate.clone(),
                        artifact.name.unwrap_or_else(|| coordinate.name.clone()),
                        artifact.kind.unwrap_or_else(|| ext.clone()),
                        ext,
                        artifact.classifier,
                    )
                })
                .collect::<BTreeSet<_>>();
            let configuration = Configuration {
                name: name.clone(),
                description: raw.description,
                visible: raw.visible.unwrap_or(true),
                transitive: raw.transitive.unwrap_or(true),
                extends: raw.extends,
                artifacts,
                dependencies: raw.dependencies,
            };
            metadata.configurations.insert(name, configuration);
        }

        for configuration in metadata.configurations.values() {
            if let Some(parent) = configuration
                .extends
                .iter()
                .find(|parent| !metadata.configurations.contains_key(parent.as_str()))
            {
                return Err(ParseError::UndeclaredParent {
                    configuration: configuration.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        Ok(metadata)
    }
}

impl FormatAdapter for TomlDescriptorFormat {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn descriptor_location(&self, module: &ModuleCoordinate) -> String {
        self.layout
            .descriptor_location(&Self::descriptor_artifact(module))
    }

    fn version_listing_location(&self, selector: &ModuleSelector) -> String {
        self.layout.version_listing_location(selector)
    }

    fn artifact_location(&self, artifact: &ArtifactDescriptor) -> String {
        self.layout.artifact_location(artifact)
    }

    fn parse_metadata(
        &self,
        bytes: &[u8],
        context: &ParseContext<'_>,
    ) -> Result<ModuleMetadata, ParseError> {
        let raw = toml::from_str::<RawDescriptor>(std::str::from_utf8(bytes)?)?;
        let metadata = Self::into_metadata(raw)?;
        if &metadata.coordinate != context.requested {
            return Err(ParseError::CoordinateMismatch {
                expected: context.requested.to_string(),
                found: metadata.coordinate.to_string(),
            });
        }
        debug!(
            "Parsed descriptor of {} from {}",
            metadata.coordinate, context.repository
        );
        Ok(metadata)
    }

    fn parse_version_listing(&self, bytes: &[u8]) -> Result<BTreeSet<Version>, ParseError> {
        let raw = toml::from_str::<RawVersionListing>(std::str::from_utf8(bytes)?)?;
        Ok(raw.versions.into_iter().collect())
    }
}
