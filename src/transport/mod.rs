use std::time::Duration;

use thiserror::Error;

mod file;
mod timeout;

pub use file::FileTransport;
pub use timeout::TimeoutTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error accessing {location}: {source}")]
    IO {
        location: String,
        source: std::io::Error,
    },
    #[error("Repository root {location} is unreachable")]
    Unreachable { location: String },
    #[error("Timed out after {timeout:?} accessing {location}")]
    TimedOut { location: String, timeout: Duration },
    #[error("Transport call for {location} was interrupted")]
    Interrupted { location: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(Vec<u8>),
    NotFound,
}

/// Access to the remote side of a repository. Calls block until they complete.
pub trait Transport: Send + Sync {
    fn fetch(&self, location: &str) -> Result<FetchOutcome, TransportError>;

    /// Checks that a resource exists without downloading it.
    fn probe_exists(&self, location: &str) -> Result<bool, TransportError>;
}
