// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Durable registry storage: lock, re-read, mutate, atomic replace.

use std::path::PathBuf;
use std::time::Duration;

use hack_config::{atomic_write, FileLock};

use crate::document::RegistryDocument;
use crate::error::RegistryError;

const LOCK_DEADLINE: Duration = Duration::from_secs(5);

/// Owns the registry file path and its sidecar lock path.
pub struct RegistryStore {
    doc_path: PathBuf,
    lock_path: PathBuf,
}

impl RegistryStore {
    pub fn new(doc_path: PathBuf, lock_path: PathBuf) -> Self {
        Self { doc_path, lock_path }
    }

    fn read(&self) -> Result<RegistryDocument, RegistryError> {
        match std::fs::read(&self.doc_path) {
            Ok(bytes) if bytes.is_empty() => Ok(RegistryDocument::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(RegistryError::Corrupt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryDocument::new()),
            Err(e) => Err(RegistryError::Io(e)),
        }
    }

    fn write(&self, doc: &RegistryDocument) -> Result<(), RegistryError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(RegistryError::Corrupt)?;
        atomic_write(&self.doc_path, &bytes)
            .map_err(|e| RegistryError::Io(std::io::Error::other(e.to_string())))
    }

    /// Acquire the sidecar lock, re-read the current document so concurrent
    /// writers are never lost, run `mutate`, and persist the result.
    /// Returns whatever `mutate` returns.
    pub fn with_lock<T>(
        &self,
        mutate: impl FnOnce(&mut RegistryDocument) -> T,
    ) -> Result<T, RegistryError> {
        let _lock = FileLock::acquire(&self.lock_path, LOCK_DEADLINE)?;
        let mut doc = self.read()?;
        let result = mutate(&mut doc);
        self.write(&doc)?;
        Ok(result)
    }

    /// Read-only snapshot; still takes the lock in the absence of a shared
    /// mode, since [`fs2`] only exposes exclusive/shared locking per-OS and
    /// the registry is small enough that a brief exclusive hold is cheap.
    pub fn snapshot(&self) -> Result<RegistryDocument, RegistryError> {
        let _lock = FileLock::acquire(&self.lock_path, LOCK_DEADLINE)?;
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use hack_core::SystemClock;

    use super::*;

    #[test]
    fn registers_and_reloads_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join("projects.json");
        let lock_path = dir.path().join("projects.json.lock");
        let store = RegistryStore::new(doc_path.clone(), lock_path.clone());

        store
            .with_lock(|doc| {
                doc.register("widgets", "dev.local", "/r".into(), "/r/.hack".into(), &SystemClock)
                    .unwrap();
            })
            .unwrap();

        let reopened = RegistryStore::new(doc_path, lock_path);
        let snapshot = reopened.snapshot().unwrap();
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.projects[0].name, "widgets");
    }

    #[test]
    fn four_concurrent_appenders_yield_the_union_with_no_lost_updates() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join("projects.json");
        let lock_path = dir.path().join("projects.json.lock");

        std::thread::scope(|scope| {
            for i in 0..4 {
                let doc_path = doc_path.clone();
                let lock_path = lock_path.clone();
                scope.spawn(move || {
                    let store = RegistryStore::new(doc_path, lock_path);
                    store
                        .with_lock(|doc| {
                            doc.register(
                                format!("p{i}"),
                                "dev.local",
                                format!("/r{i}").into(),
                                format!("/r{i}/.hack").into(),
                                &SystemClock,
                            )
                            .unwrap();
                        })
                        .unwrap();
                });
            }
        });

        let store = RegistryStore::new(doc_path, lock_path);
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.projects.len(), 4);
        let mut ids: Vec<_> = snapshot.projects.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
