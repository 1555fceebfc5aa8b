use std::{io::ErrorKind, path::PathBuf};

use log::trace;

use super::{FetchOutcome, Transport, TransportError};

/// Serves a repository laid out in a local or mounted directory.
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    pub fn new(root: impl Into<PathBuf>) -> FileTransport {
        FileTransport { root: root.into() }
    }

    fn resolve(&self, location: &str) -> Result<PathBuf, TransportError> {
        if !self.root.is_dir() {
            return Err(TransportError::Unreachable {
                location: self.root.display().to_string(),
            });
        }
        Ok(self.root.join(location.trim_start_matches('/')))
    }
}

impl Transport for FileTransport {
    fn fetch(&self, location: &str) -> Result<FetchOutcome, TransportError> {
        let path = self.resolve(location)?;
        trace!("Reading {}", path.display());
        match std::fs::read(&path) {
            Ok(bytes) => Ok(FetchOutcome::Found(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(FetchOutcome::NotFound),
            Err(source) => Err(TransportError::IO {
                location: path.display().to_string(),
                source,
            }),
        }
    }

    fn probe_exists(&self, location: &str) -> Result<bool, TransportError> {
        let path = self.resolve(location)?;
        trace!("Probing {}", path.display());
        path.try_exists()
            .map(|exists| exists && path.is_file())
            .map_err(|source| TransportError::IO {
                location: path.display().to_string(),
                source,
            })
    }
}
