use crate::model::{ArtifactDescriptor, ModuleSelector};

pub const DEFAULT_DESCRIPTOR_PATTERN: &str =
    "[organisation]/[module]/[revision]/[artifact]-[revision].[ext]";
pub const DEFAULT_ARTIFACT_PATTERN: &str =
    "[organisation]/[module]/[revision]/[artifact]-[revision](-[classifier]).[ext]";

const VERSION_LISTING: &str = "versions.toml";

/// Location patterns of a repository.
///
/// Tokens are written `[name]`. A segment in parentheses is dropped when one of
/// its tokens has no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLayout {
    descriptor_pattern: String,
    artifact_pattern: String,
}

impl Default for PatternLayout {
    fn default() -> Self {
        PatternLayout::new(DEFAULT_DESCRIPTOR_PATTERN, DEFAULT_ARTIFACT_PATTERN)
    }
}

impl PatternLayout {
    pub fn new(
        descriptor_pattern: impl Into<String>,
        artifact_pattern: impl Into<String>,
    ) -> PatternLayout {
        PatternLayout {
            descriptor_pattern: descriptor_pattern.into(),
            artifact_pattern: artifact_pattern.into(),
        }
    }

    pub fn descriptor_location(&self, descriptor: &ArtifactDescriptor) -> String {
        substitute(&self.descriptor_pattern, &artifact_tokens(descriptor))
    }

    pub fn artifact_location(&self, artifact: &ArtifactDescriptor) -> String {
        substitute(&self.artifact_pattern, &artifact_tokens(artifact))
    }

    /// The module's directory is the descriptor pattern up to its `[revision]` segment.
    pub fn version_listing_location(&self, selector: &ModuleSelector) -> String {
        let pattern = &self.descriptor_pattern;
        let directory = pattern
            .find("[revision]")
            .and_then(|index| pattern[..index].rfind('/').map(|slash| &pattern[..=slash]))
            .unwrap_or("");
        let tokens = [
            ("organisation", Some(selector.group.as_str())),
            ("module", Some(selector.name.as_str())),
        ];
        format!("{}{}", substitute(directory, &tokens), VERSION_LISTING)
    }
}

fn artifact_tokens(artifact: &ArtifactDescriptor) -> [(&str, Option<&str>); 7] {
    [
        ("organisation", Some(artifact.module.group.as_str())),
        ("module", Some(artifact.module.name.as_str())),
        ("revision", Some(artifact.module.version.as_str())),
        ("artifact", Some(artifact.name.as_str())),
        ("type", Some(artifact.kind.as_str())),
        ("ext", Some(artifact.extension.as_str())),
        ("classifier", artifact.classifier.as_deref()),
    ]
}

fn substitute(pattern: &str, tokens: &[(&str, Option<&str>)]) -> String {
    let mut output = String::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('(') {
        output.push_str(&substitute_tokens(&rest[..open], tokens).0);
        match rest[open..].find(')') {
            Some(close) => {
                let (optional, complete) = substitute_tokens(&rest[open + 1..open + close], tokens);
                if complete {
                    output.push_str(&optional);
                }
                rest = &rest[open + close + 1..];
            }
            None => {
                output.push_str(&substitute_tokens(&rest[open..], tokens).0);
                rest = "";
            }
        }
    }
    output.push_str(&substitute_tokens(rest, tokens).0);
    output
}

/// Returns the substituted text and whether every token had a value.
fn substitute_tokens(text: &str, tokens: &[(&str, Option<&str>)]) -> (String, bool) {
    let mut output = String::new();
    let mut complete = true;
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        output.push_str(&rest[..open]);
        match rest[open..].find(']') {
            Some(close) => {
                let name = &rest[open + 1..open + close];
                match tokens.iter().find(|(token, _)| *token == name) {
                    Some((_, Some(value))) => output.push_str(value),
                    Some((_, None)) => complete = false,
                    // Unknown tokens are kept verbatim.
                    None => output.push_str(&rest[open..=open + close]),
                }
                rest = &rest[open + close + 1..];
            }
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    (output, complete)
}
