// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Durable token storage: lock, re-read, mutate, atomic replace — the same
//! pattern as `hack_registry::RegistryStore`.

use std::path::PathBuf;
use std::time::Duration;

use hack_config::{atomic_write, FileLock};

use crate::document::TokenDocument;
use crate::error::GatewayError;

const LOCK_DEADLINE: Duration = Duration::from_secs(5);

pub struct TokenStore {
    doc_path: PathBuf,
    lock_path: PathBuf,
}

impl TokenStore {
    pub fn new(doc_path: PathBuf, lock_path: PathBuf) -> Self {
        Self { doc_path, lock_path }
    }

    fn read(&self) -> Result<TokenDocument, GatewayError> {
        match std::fs::read(&self.doc_path) {
            Ok(bytes) if bytes.is_empty() => Ok(TokenDocument::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(GatewayError::Corrupt),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TokenDocument::new()),
            Err(e) => Err(GatewayError::Io(e)),
        }
    }

    fn write(&self, doc: &TokenDocument) -> Result<(), GatewayError> {
        let bytes = serde_json::to_vec_pretty(doc).map_err(GatewayError::Corrupt)?;
        atomic_write(&self.doc_path, &bytes).map_err(|e| GatewayError::Io(std::io::Error::other(e.to_string())))
    }

    pub fn with_lock<T>(&self, mutate: impl FnOnce(&mut TokenDocument) -> T) -> Result<T, GatewayError> {
        let _lock = FileLock::acquire(&self.lock_path, LOCK_DEADLINE)?;
        let mut doc = self.read()?;
        let result = mutate(&mut doc);
        self.write(&doc)?;
        Ok(result)
    }

    pub fn snapshot(&self) -> Result<TokenDocument, GatewayError> {
        let _lock = FileLock::acquire(&self.lock_path, LOCK_DEADLINE)?;
        self.read()
    }
}
