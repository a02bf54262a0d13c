// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Supervisor error taxonomy (spec §7).

use thiserror::Error;

use hack_core::ErrorKind;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("shell {0} not found")]
    ShellNotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("pty error: {0}")]
    Pty(String),
}

impl SupervisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SupervisorError::JobNotFound(_) | SupervisorError::ShellNotFound(_) => ErrorKind::NotFound,
            SupervisorError::SpawnFailed(_) | SupervisorError::Pty(_) => ErrorKind::Transient,
        }
    }
}
