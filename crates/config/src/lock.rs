// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Cooperative file lock with bounded retry (spec §4.5).

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock contention exceeded {0:?}")]
    Timeout(Duration),
    #[error("io error opening lock file {path:?}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

/// An acquired exclusive lock on a sidecar `.lock` file. Released on drop.
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Acquire the lock, retrying with jittered exponential backoff until
    /// `deadline` elapses (default 5s per spec §4.5).
    pub fn acquire(path: &Path, deadline: Duration) -> Result<Self, LockError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Io { path: path.to_path_buf(), source })?;

        let start = Instant::now();
        let mut delay = Duration::from_millis(10);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(_) if start.elapsed() >= deadline => return Err(LockError::Timeout(deadline)),
                Err(_) => {
                    let jitter_ms: u64 = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 2 + 1);
                    std::thread::sleep(delay + Duration::from_millis(jitter_ms));
                    delay = (delay * 2).min(Duration::from_millis(500));
                }
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_uncontended_lock() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.lock");
        let lock = FileLock::acquire(&path, Duration::from_secs(1)).expect("acquire");
        drop(lock);
    }

    #[test]
    fn times_out_on_contention() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("registry.lock");
        let held = FileLock::acquire(&path, Duration::from_secs(1)).expect("first acquire");
        let err = FileLock::acquire(&path, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, LockError::Timeout(_)));
        drop(held);
    }
}
