use std::collections::{BTreeMap, BTreeSet};

use super::{ArtifactDescriptor, ModuleCoordinate, ModuleSelector};

pub const DEFAULT_EXTENSION: &str = "jar";
pub const DEFAULT_STATUS: &str = "release";

/// Resolved descriptor of one module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub coordinate: ModuleCoordinate,
    pub status: String,
    /// Extension of the module's primary artifacts, used when probing for
    /// undeclared companions.
    pub extension: String,
    pub configurations: BTreeMap<String, Configuration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub name: String,
    pub description: Option<String>,
    pub visible: bool,
    pub transitive: bool,
    pub extends: Vec<String>,
    pub artifacts: BTreeSet<ArtifactDescriptor>,
    pub dependencies: Vec<ModuleSelector>,
}

impl Configuration {
    pub fn new(name: impl Into<String>) -> Configuration {
        Configuration {
            name: name.into(),
            description: None,
            visible: true,
            transitive: true,
            extends: Vec::new(),
            artifacts: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }
}

impl ModuleMetadata {
    pub fn new(coordinate: ModuleCoordinate) -> ModuleMetadata {
        ModuleMetadata {
            coordinate,
            status: DEFAULT_STATUS.to_owned(),
            extension: DEFAULT_EXTENSION.to_owned(),
            configurations: BTreeMap::new(),
        }
    }

    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations.get(name)
    }

    /// Artifacts of a configuration, including those inherited through `extends`.
    pub fn configuration_artifacts(&self, name: &str) -> Option<BTreeSet<ArtifactDescriptor>> {
        self.configuration(name)?;

        let mut artifacts = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![name];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(configuration) = self.configuration(current) {
                artifacts.extend(configuration.artifacts.iter().cloned());
                pending.extend(configuration.extends.iter().map(String::as_str));
            }
        }
        Some(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn artifact(name: &str) -> ArtifactDescriptor {
        ArtifactDescriptor::new(
            ModuleCoordinate::new("g", "lib", "1.0"),
            name,
            "jar",
            "jar",
            None,
        )
    }

    #[test]
    fn configuration_artifacts_follow_extends() {
        let mut metadata = ModuleMetadata::new(ModuleCoordinate::new("g", "lib", "1.0"));
        let mut compile = Configuration::new("compile");
        compile.artifacts.insert(artifact("api"));
        let mut runtime = Configuration::new("runtime");
        runtime.extends.push("compile".to_owned());
        runtime.artifacts.insert(artifact("impl"));
        // Cycles terminate.
        compile.extends.push("runtime".to_owned());
        metadata.configurations.insert("compile".to_owned(), compile);
        metadata.configurations.insert("runtime".to_owned(), runtime);

        assert_eq!(
            metadata.configuration_artifacts("runtime"),
            Some(BTreeSet::from([artifact("api"), artifact("impl")]))
        );
        assert_eq!(metadata.configuration_artifacts("test"), None);
    }
}
