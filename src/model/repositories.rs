use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use super::ParseError;

pub const DEFAULT_FORMAT: &str = "toml";

/// Repositories declared in `artifetch.toml`, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoriesFile {
    #[serde(default, rename = "repository")]
    pub repositories: Vec<RepositoryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDefinition {
    pub name: String,
    /// Repository root directory, relative paths are resolved against the project root.
    pub url: PathBuf,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_pattern: Option<String>,
}

fn default_format() -> String {
    DEFAULT_FORMAT.to_owned()
}

impl RepositoriesFile {
    pub fn from_file(path: &Path) -> Result<RepositoriesFile, ParseError> {
        debug!("Attempting to read repositories from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        RepositoriesFile::from_toml_str(&contents)
    }

    pub fn from_toml_str(data: &str) -> Result<RepositoriesFile, ParseError> {
        let file = toml::from_str::<RepositoriesFile>(data)?;
        let mut names = HashSet::new();
        for repository in &file.repositories {
            if repository.name.is_empty() {
                return Err(ParseError::MissingKey("name".to_owned()));
            }
            // Cache entries are scoped by repository name.
            if !names.insert(repository.name.as_str()) {
                return Err(ParseError::DuplicateRepository(repository.name.clone()));
            }
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_repositories() {
        let str = r#"
            [[repository]]
            name = "mirror"
            url = "repos/mirror"

            [[repository]]
            name = "central"
            url = "/srv/central"
            format = "toml"
            artifact_pattern = "[organisation]/[module]/[artifact]-[revision].[ext]"
        "#;
        let expected = RepositoriesFile {
            repositories: vec![
                RepositoryDefinition {
                    name: "mirror".to_owned(),
                    url: PathBuf::from("repos/mirror"),
                    format: "toml".to_owned(),
                    descriptor_pattern: None,
                    artifact_pattern: None,
                },
                RepositoryDefinition {
                    name: "central".to_owned(),
                    url: PathBuf::from("/srv/central"),
                    format: "toml".to_owned(),
                    descriptor_pattern: None,
                    artifact_pattern: Some(
                        "[organisation]/[module]/[artifact]-[revision].[ext]".to_owned(),
                    ),
                },
            ],
        };
        assert_eq!(RepositoriesFile::from_toml_str(str).unwrap(), expected);
    }

    #[test]
    fn load_empty_file() {
        assert_eq!(
            RepositoriesFile::from_toml_str("").unwrap(),
            RepositoriesFile::default()
        );
    }

    #[test]
    fn reject_unnamed_repository() {
        let str = r#"
            [[repository]]
            name = ""
            url = "repos/mirror"
        "#;
        assert!(RepositoriesFile::from_toml_str(str).is_err());
    }

    #[test]
    fn reject_duplicate_repository_names() {
        let str = r#"
            [[repository]]
            name = "central"
            url = "repos/central"

            [[repository]]
            name = "central"
            url = "repos/mirror"
        "#;
        assert!(matches!(
            RepositoriesFile::from_toml_str(str),
            Err(ParseError::DuplicateRepository(name)) if name == "central"
        ));
    }
}
