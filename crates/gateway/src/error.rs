// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Gateway error taxonomy (spec §7).

use thiserror::Error;

use hack_core::ErrorKind;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("write scope required")]
    WriteScopeRequired,
    #[error("writes disabled")]
    WritesDisabled,
    #[error("token not found: {0}")]
    TokenNotFound(String),
    #[error("lock error: {0}")]
    LockTimeout(#[from] hack_config::LockError),
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
    #[error("corrupt token store: {0}")]
    Corrupt(#[source] serde_json::Error),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::MissingToken | GatewayError::InvalidToken => ErrorKind::Unauthenticated,
            GatewayError::WriteScopeRequired | GatewayError::WritesDisabled => ErrorKind::Unauthorized,
            GatewayError::TokenNotFound(_) => ErrorKind::NotFound,
            GatewayError::LockTimeout(_) | GatewayError::Io(_) | GatewayError::Corrupt(_) => ErrorKind::Fatal,
        }
    }

    /// The HTTP status + machine-readable reason pair from spec §4.4.
    pub fn http(&self) -> (u16, &'static str) {
        match self {
            GatewayError::MissingToken => (401, "missing_token"),
            GatewayError::InvalidToken => (401, "invalid_token"),
            GatewayError::WriteScopeRequired => (403, "write_scope_required"),
            GatewayError::WritesDisabled => (403, "writes_disabled"),
            GatewayError::TokenNotFound(_) => (404, "not_found"),
            GatewayError::LockTimeout(_) | GatewayError::Io(_) | GatewayError::Corrupt(_) => (500, "internal"),
        }
    }
}
