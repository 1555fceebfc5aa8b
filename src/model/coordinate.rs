use std::{
    fmt::{Display, Write},
    path::PathBuf,
    str::FromStr,
};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::{ParseError, Version};

const COORDINATE_PATTERN: &str =
    r"^(?P<group>[^:\s]+):(?P<name>[^:\s]+)(:(?P<version>[^:\s]+))?$";

/// A single module version, `group:name:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ModuleCoordinate {
    pub group: String,
    pub name: String,
    pub version: String,
}

impl ModuleCoordinate {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> ModuleCoordinate {
        ModuleCoordinate {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn to_path(&self) -> PathBuf {
        let mut result = PathBuf::new();

        result.push(&self.group);
        result.push(&self.name);
        result.push(&self.version);

        result
    }

    pub fn version(&self) -> Version {
        Version::new(self.version.clone())
    }
}

impl Display for ModuleCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl FromStr for ModuleCoordinate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_parts(s) {
            Some((group, name, Some(version))) => Ok(ModuleCoordinate::new(group, name, version)),
            _ => Err(ParseError::InvalidCoordinate(s.to_owned())),
        }
    }
}

fn parse_parts(s: &str) -> Option<(String, String, Option<String>)> {
    let re: Regex = Regex::new(COORDINATE_PATTERN).unwrap();
    let captures = re.captures(s.trim())?;
    let group = captures.name("group")?.as_str().to_owned();
    let name = captures.name("name")?.as_str().to_owned();
    let version = captures.name("version").map(|v| v.as_str().to_owned());
    Some((group, name, version))
}

/// Which versions of a module a request accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum VersionConstraint {
    Exact(String),
    /// `1.+` matches every version starting with `1.`.
    Prefix(String),
    /// `+` or `latest`.
    Latest,
}

impl VersionConstraint {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, VersionConstraint::Exact(_))
    }

    pub fn accepts(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Exact(exact) => version.as_str() == exact,
            VersionConstraint::Prefix(prefix) => version.as_str().starts_with(prefix.as_str()),
            VersionConstraint::Latest => true,
        }
    }

    /// Highest version accepted by this constraint.
    pub fn select<'a>(&self, versions: impl IntoIterator<Item = &'a Version>) -> Option<&'a Version> {
        versions.into_iter().filter(|v| self.accepts(v)).max()
    }
}

impl FromStr for VersionConstraint {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" => Err(ParseError::InvalidSelector(value.to_owned())),
            "+" | "latest" | "latest.integration" | "latest.release" => {
                Ok(VersionConstraint::Latest)
            }
            value => match value.strip_suffix('+') {
                Some(prefix) => Ok(VersionConstraint::Prefix(prefix.to_owned())),
                None => Ok(VersionConstraint::Exact(value.to_owned())),
            },
        }
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionConstraint::Exact(version) => f.write_str(version),
            VersionConstraint::Prefix(prefix) => {
                f.write_str(prefix)?;
                f.write_char('+')
            }
            VersionConstraint::Latest => f.write_char('+'),
        }
    }
}

/// A requested module: group, name and a version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleSelector {
    pub group: String,
    pub name: String,
    pub constraint: VersionConstraint,
}

impl ModuleSelector {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        constraint: VersionConstraint,
    ) -> ModuleSelector {
        ModuleSelector {
            group: group.into(),
            name: name.into(),
            constraint,
        }
    }

    /// The coordinate this selector names, if it is not dynamic.
    pub fn as_coordinate(&self) -> Option<ModuleCoordinate> {
        match &self.constraint {
            VersionConstraint::Exact(version) => Some(ModuleCoordinate::new(
                self.group.clone(),
                self.name.clone(),
                version.clone(),
            )),
            _ => None,
        }
    }

    pub fn with_version(&self, version: &Version) -> ModuleCoordinate {
        ModuleCoordinate::new(self.group.clone(), self.name.clone(), version.as_str())
    }
}

impl Display for ModuleSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.constraint)
    }
}

impl FromStr for ModuleSelector {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, name, constraint) =
            parse_parts(s).ok_or_else(|| ParseError::InvalidSelector(s.to_owned()))?;
        let constraint = match constraint {
            Some(constraint) => constraint.parse()?,
            None => VersionConstraint::Latest,
        };
        Ok(ModuleSelector::new(group, name, constraint))
    }
}

impl From<ModuleCoordinate> for ModuleSelector {
    fn from(coordinate: ModuleCoordinate) -> Self {
        ModuleSelector::new(
            coordinate.group,
            coordinate.name,
            VersionConstraint::Exact(coordinate.version),
        )
    }
}

impl TryFrom<String> for ModuleSelector {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModuleSelector> for String {
    fn from(selector: ModuleSelector) -> Self {
        selector.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parse_coordinate() {
        assert_eq!(
            "org.example:lib:1.0".parse::<ModuleCoordinate>().unwrap(),
            ModuleCoordinate::new("org.example", "lib", "1.0")
        );
        assert_eq!(
            ModuleCoordinate::new("g", "lib", "1.0").to_path(),
            PathBuf::from("g/lib/1.0")
        );
    }

    #[test]
    fn parse_coordinate_without_version() {
        assert!("g:lib".parse::<ModuleCoordinate>().is_err());
        assert!("g".parse::<ModuleCoordinate>().is_err());
        assert!("g:lib:1.0:extra".parse::<ModuleCoordinate>().is_err());
    }

    #[test]
    fn parse_selectors() {
        assert_eq!(
            "g:lib".parse::<ModuleSelector>().unwrap(),
            ModuleSelector::new("g", "lib", VersionConstraint::Latest)
        );
        assert_eq!(
            "g:lib:1.+".parse::<ModuleSelector>().unwrap(),
            ModuleSelector::new("g", "lib", VersionConstraint::Prefix("1.".to_owned()))
        );
        assert_eq!(
            "g:lib:latest.release".parse::<ModuleSelector>().unwrap(),
            ModuleSelector::new("g", "lib", VersionConstraint::Latest)
        );
        let exact = "g:lib:2.0".parse::<ModuleSelector>().unwrap();
        assert_eq!(
            exact.as_coordinate(),
            Some(ModuleCoordinate::new("g", "lib", "2.0"))
        );
        assert_eq!(exact.to_string(), "g:lib:2.0");
    }

    #[test]
    fn select_highest_accepted_version() {
        let versions = ["1.0", "1.10", "1.2", "2.0-rc1", "2.0"]
            .into_iter()
            .map(Version::from)
            .collect::<Vec<_>>();

        let prefix = VersionConstraint::Prefix("1.".to_owned());
        assert_eq!(prefix.select(&versions), Some(&Version::from("1.10")));
        assert_eq!(
            VersionConstraint::Latest.select(&versions),
            Some(&Version::from("2.0"))
        );
        assert_eq!(
            VersionConstraint::Exact("3.0".to_owned()).select(&versions),
            None
        );
    }
}
