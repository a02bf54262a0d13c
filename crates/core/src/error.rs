// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Error taxonomy shared by every layer (spec §7).
//!
//! Components return tagged errors; no exception-based control flow crosses
//! a component boundary. `ErrorKind` is the stable classification the daemon
//! uses to pick an HTTP status / exit code at the outermost edge — inner
//! crates never encode transport concerns themselves.

use thiserror::Error;

/// The six error kinds carried through all layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; never retried.
    Validation,
    /// Unknown project, job, shell, session, ticket.
    NotFound,
    /// Duplicate entry, lock contention exceeded.
    Conflict,
    /// Missing or invalid credential.
    Unauthenticated,
    /// Credential valid but insufficient scope, or writes disabled.
    Unauthorized,
    /// Transient failure; the caller may retry.
    Transient,
    /// Unrecoverable; the process should exit non-zero.
    Fatal,
}

/// A generic workspace error carrying a stable taxonomy kind plus a human
/// message. Crate-specific error enums implement `From<HackError>` /
/// `Into<HackError>` at their boundary rather than replacing this type.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HackError {
    pub kind: ErrorKind,
    pub message: String,
    /// Set on `Transient` errors to hint that a retry is semantically safe.
    pub retryable: bool,
}

impl HackError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let retryable = kind == ErrorKind::Transient;
        Self { kind, message: message.into(), retryable }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// Stable short code used in user-visible error payloads (spec §7).
    pub fn code(&self) -> &'static str {
        match self.kind {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        }
    }
}
