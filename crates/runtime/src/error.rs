// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Runtime-backend error taxonomy (spec §7).

use thiserror::Error;

use hack_core::ErrorKind;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime CLI unreachable: {0}")]
    Unreachable(String),
    #[error("runtime CLI exited non-zero: {0}")]
    CommandFailed(String),
    #[error("runtime CLI produced unparsable output: {0}")]
    Unparsable(String),
    #[error("runtime CLI timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Unreachable(_) | RuntimeError::Timeout(_) => ErrorKind::Transient,
            RuntimeError::CommandFailed(_) | RuntimeError::Unparsable(_) => ErrorKind::Transient,
        }
    }
}
