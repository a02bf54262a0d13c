// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! The daemon-level error taxonomy (spec §7): every dependency crate's
//! `.kind()` funnels through here, and this is the single place that picks
//! an HTTP status / exit code from an `ErrorKind`. Inner crates never know
//! about transports; this is the edge.

use thiserror::Error;

use hack_core::ErrorKind;
use hack_gateway::GatewayError;
use hack_registry::RegistryError;
use hack_runtime::RuntimeError;
use hack_supervisor::SupervisorError;
use hack_tickets::TicketsError;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Tickets(#[from] TicketsError),
    #[error("{0}")]
    Validation(String),
}

impl DaemonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DaemonError::Registry(e) => e.kind(),
            DaemonError::Runtime(e) => e.kind(),
            DaemonError::Supervisor(e) => e.kind(),
            DaemonError::Gateway(e) => e.kind(),
            DaemonError::Tickets(e) => e.kind(),
            DaemonError::Validation(_) => ErrorKind::Validation,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient)
    }

    /// HTTP status for the gateway. `GatewayError` carries its own exact
    /// status/reason pair (spec §4.4); every other kind maps by the table
    /// in spec §7.
    pub fn http_status(&self) -> u16 {
        if let DaemonError::Gateway(e) = self {
            return e.http().0;
        }
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Unauthorized => 403,
            ErrorKind::Transient => 503,
            ErrorKind::Fatal => 500,
        }
    }

    /// Process exit code for CLI-facing failures (spec §7).
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::NotFound | ErrorKind::Conflict => 1,
            ErrorKind::Unauthenticated | ErrorKind::Unauthorized => 1,
            ErrorKind::Transient => 1,
            ErrorKind::Fatal => 70,
        }
    }
}
