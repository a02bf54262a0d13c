// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Tickets channel error taxonomy (spec §7).

use thiserror::Error;

use hack_core::ErrorKind;

#[derive(Debug, Error)]
pub enum TicketsError {
    #[error("non-fast-forward push rejected: {0}")]
    NonFastForward(String),
    #[error("hidden ref rejected by remote; switch ref mode to continue: {0}")]
    HiddenRefRejected(String),
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("unparsable git output: {0}")]
    Unparsable(String),
    #[error("repair declined: branch already minimal")]
    RepairDeclined,
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
}

impl TicketsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketsError::NonFastForward(_) => ErrorKind::Transient,
            TicketsError::HiddenRefRejected(_) => ErrorKind::Conflict,
            TicketsError::CommandFailed(_) | TicketsError::Unparsable(_) | TicketsError::Io(_) => ErrorKind::Fatal,
            TicketsError::RepairDeclined => ErrorKind::Validation,
        }
    }
}
