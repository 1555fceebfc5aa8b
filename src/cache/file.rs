use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime},
};

use log::{debug, info, trace};

use super::{CacheError, CacheKey, CacheStore};
use crate::flock::FileLock;

const LOCK_FILE: &str = ".lock";
const LOCK_PATIENCE: Duration = Duration::from_secs(300);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cache entries stored as plain files under one directory.
pub struct FileCacheStore {
    location: PathBuf,
    _lock: FileLock,
}

impl FileCacheStore {
    pub fn new(location: PathBuf) -> Result<FileCacheStore, CacheError> {
        if location.exists() {
            if !location.is_dir() {
                return Err(CacheError::BadLocation {
                    location: location.to_str().unwrap_or("").to_string(),
                });
            }
        } else {
            std::fs::create_dir_all(&location)?;
        }

        let lock_path = location.join(LOCK_FILE);
        debug!(
            "Acquiring a lock on the cache location: {}",
            lock_path.display()
        );
        let lock = FileLock::acquire(&lock_path, LOCK_PATIENCE)?;

        Ok(FileCacheStore {
            location,
            _lock: lock,
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn temporary_path(path: &Path) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        path.with_file_name(format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            counter
        ))
    }
}

impl CacheStore for FileCacheStore {
    fn read_entry(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write_entry(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temporary = Self::temporary_path(&path);
        trace!("Writing {} via {}", path.display(), temporary.display());
        let written = std::fs::File::create(&temporary)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .and_then(|_| std::fs::rename(&temporary, &path));
        if let Err(error) = written {
            let _ = std::fs::remove_file(&temporary);
            return Err(error.into());
        }
        Ok(())
    }

    fn entry_age(&self, key: &CacheKey) -> Result<Option<Duration>, CacheError> {
        match std::fs::metadata(self.entry_path(key)) {
            Ok(metadata) => {
                let modified = metadata.modified()?;
                Ok(Some(
                    SystemTime::now()
                        .duration_since(modified)
                        .unwrap_or(Duration::ZERO),
                ))
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.location.join(key.relative_path())
    }

    fn clear(&self) -> Result<(), CacheError> {
        if self.location.exists() {
            info!("Clearing artifetch cache {}.", self.location.display());
            for entry in std::fs::read_dir(&self.location)? {
                let entry = entry?;
                if entry.file_name() == LOCK_FILE {
                    continue;
                }
                if entry.file_type()?.is_dir() {
                    std::fs::remove_dir_all(entry.path())?;
                } else {
                    std::fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}
