use std::{
    fmt::{Display, Write},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use super::ModuleCoordinate;

/// Identity of one file published by one module version.
///
/// A missing classifier is not the same artifact as an empty classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub module: ModuleCoordinate,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
}

impl ArtifactDescriptor {
    pub fn new(
        module: ModuleCoordinate,
        name: impl Into<String>,
        kind: impl Into<String>,
        extension: impl Into<String>,
        classifier: Option<String>,
    ) -> ArtifactDescriptor {
        ArtifactDescriptor {
            module,
            name: name.into(),
            kind: kind.into(),
            extension: extension.into(),
            classifier,
        }
    }

    /// `<name>-<version>[-<classifier>].<extension>`
    pub fn file_name(&self) -> String {
        let mut file_name = format!("{}-{}", self.name, self.module.version);
        if let Some(classifier) = &self.classifier {
            file_name.push('-');
            file_name.push_str(classifier);
        }
        file_name.push('.');
        file_name.push_str(&self.extension);
        file_name
    }
}

impl Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.name)?;
        if let Some(classifier) = &self.classifier {
            f.write_char(':')?;
            f.write_str(classifier)?;
        }
        write!(f, "@{}", self.extension)
    }
}

/// Which artifacts of a module a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum ArtifactCategory {
    /// Artifacts declared by a configuration of the module metadata.
    Configuration(String),
    Documentation,
    Sources,
}

impl ArtifactCategory {
    /// Type and classifier used to guess an undeclared artifact of this category.
    pub fn probe_convention(&self) -> Option<(&'static str, &'static str)> {
        match self {
            ArtifactCategory::Configuration(_) => None,
            ArtifactCategory::Documentation => Some(("javadoc", "javadoc")),
            ArtifactCategory::Sources => Some(("source", "sources")),
        }
    }

    /// Name of the configuration that declares this category in module metadata.
    pub fn configuration_name(&self) -> &str {
        match self {
            ArtifactCategory::Configuration(name) => name,
            ArtifactCategory::Documentation => "javadoc",
            ArtifactCategory::Sources => "sources",
        }
    }

    /// Candidate artifact probed for when metadata does not declare this category.
    pub fn probe_candidate(
        &self,
        module: &ModuleCoordinate,
        extension: &str,
    ) -> Option<ArtifactDescriptor> {
        self.probe_convention().map(|(kind, classifier)| {
            ArtifactDescriptor::new(
                module.clone(),
                module.name.clone(),
                kind,
                extension,
                Some(classifier.to_owned()),
            )
        })
    }
}

impl Display for ArtifactCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactCategory::Configuration(name) => write!(f, "configuration {name}"),
            ArtifactCategory::Documentation => f.write_str("documentation"),
            ArtifactCategory::Sources => f.write_str("sources"),
        }
    }
}

/// An artifact whose content is available on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedArtifact {
    pub artifact: ArtifactDescriptor,
    pub path: PathBuf,
}
