use std::{
    fs::File,
    path::Path,
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::{debug, info};
use thiserror::Error;

const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Exclusive advisory lock held for as long as the value lives.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Lock on {path} is still held by another process after {waited:?}")]
    Contended { path: String, waited: Duration },
}

impl FileLock {
    pub fn acquire(path: &Path, patience: Duration) -> Result<Self, Error> {
        let file = File::create(path)?;
        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(_) => {
                    info!("Acquired a lock on {}", path.display());
                    return Ok(Self { _file: file });
                }
                Err(error)
                    if error.raw_os_error() == fs4::lock_contended_error().raw_os_error() =>
                {
                    if start.elapsed() >= patience {
                        return Err(Error::Contended {
                            path: path.display().to_string(),
                            waited: start.elapsed(),
                        });
                    }
                    debug!("Failed to acquire a lock on {}, retrying", path.display());
                    std::thread::sleep(RETRY_INTERVAL.min(patience));
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relock_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lock");
        let lock = FileLock::acquire(&path, Duration::ZERO).unwrap();
        drop(lock);
        FileLock::acquire(&path, Duration::ZERO).unwrap();
    }
}
