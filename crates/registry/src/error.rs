// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Registry-specific error taxonomy (spec §7).

use thiserror::Error;

use hack_core::ErrorKind;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("project name {0:?} already registered")]
    DuplicateName(String),
    #[error("no project with id {0}")]
    NotFound(String),
    #[error("registry lock contention exceeded: {0}")]
    LockTimeout(#[from] hack_config::LockError),
    #[error("registry io error: {0}")]
    Io(#[source] std::io::Error),
    #[error("registry document corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::DuplicateName(_) => ErrorKind::Conflict,
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::LockTimeout(_) => ErrorKind::Conflict,
            RegistryError::Io(_) | RegistryError::Corrupt(_) => ErrorKind::Fatal,
        }
    }
}
