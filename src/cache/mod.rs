use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;

use crate::model::{ArtifactCategory, ArtifactDescriptor, ModuleCoordinate, ModuleSelector};

mod file;
mod keyed;

pub use file::FileCacheStore;
pub use keyed::KeyedLocks;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache location {location} does not exist")]
    BadLocation { location: String },
    #[error("Cache lock cannot be acquired: {0}")]
    Lock(#[from] crate::flock::Error),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Local storage for everything a repository has fetched.
///
/// Writes must be atomic: a reader sees either the previous entry or the whole
/// new one.
pub trait CacheStore: Send + Sync {
    fn read_entry(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    fn write_entry(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;

    /// Time since the entry was last written, `None` when there is no entry.
    fn entry_age(&self, key: &CacheKey) -> Result<Option<Duration>, CacheError>;

    /// Where the content of an entry lives on the filesystem.
    fn entry_path(&self, key: &CacheKey) -> PathBuf;

    fn clear(&self) -> Result<(), CacheError>;
}

/// Identity of one cache entry, scoped by repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn descriptor(repository: &str, module: &ModuleCoordinate) -> CacheKey {
        CacheKey::from_segments(&[
            repository,
            "descriptors",
            &module.group,
            &module.name,
            &module.version,
            "descriptor",
        ])
    }

    pub fn version_listing(repository: &str, selector: &ModuleSelector) -> CacheKey {
        CacheKey::from_segments(&[
            repository,
            "versions",
            &selector.group,
            &selector.name,
            "versions",
        ])
    }

    pub fn artifact(repository: &str, artifact: &ArtifactDescriptor) -> CacheKey {
        let classifier = match &artifact.classifier {
            Some(classifier) => format!("+{classifier}"),
            None => "_".to_owned(),
        };
        CacheKey::from_segments(&[
            repository,
            "artifacts",
            &artifact.module.group,
            &artifact.module.name,
            &artifact.module.version,
            &artifact.kind,
            &artifact.name,
            &classifier,
            &artifact.file_name(),
        ])
    }

    pub fn artifact_set(
        repository: &str,
        module: &ModuleCoordinate,
        category: &ArtifactCategory,
    ) -> CacheKey {
        let category = match category {
            ArtifactCategory::Configuration(name) => format!("configuration-{name}"),
            ArtifactCategory::Documentation => "documentation".to_owned(),
            ArtifactCategory::Sources => "sources".to_owned(),
        };
        CacheKey::from_segments(&[
            repository,
            "artifact-sets",
            &module.group,
            &module.name,
            &module.version,
            &category,
        ])
    }

    fn from_segments(segments: &[&str]) -> CacheKey {
        CacheKey(
            segments
                .iter()
                .map(|segment| sanitize(segment))
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn relative_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Percent-encodes a key segment so that distinct segments stay distinct on
/// disk. A leading `.` is encoded too, which keeps `..`, `.lock` and temporary
/// files out of the key space.
fn sanitize(segment: &str) -> String {
    if segment.is_empty() {
        return "%".to_owned();
    }
    let mut sanitized = String::with_capacity(segment.len());
    for (index, c) in segment.char_indices() {
        match c {
            '.' if index == 0 => sanitized.push_str("%2E"),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' | '+' => sanitized.push(c),
            _ => {
                let mut buffer = [0; 4];
                for byte in c.encode_utf8(&mut buffer).bytes() {
                    sanitized.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    sanitized
}
