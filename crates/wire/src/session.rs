// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Named job-runner sessions (spec §4.1 `CreateJob.runner`).
//!
//! Validation lives in [`hack_core::slug`]; this module only adds the
//! wire-facing command shape so `hack-wire` doesn't need a direct
//! dependency on every lexer `hack-core` exposes.

pub use hack_core::slug::is_valid_session_name;

use serde::{Deserialize, Serialize};

/// A named runner invocation: which session-scoped shell profile to use
/// and the argv to hand it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCommand {
    pub runner: String,
    pub argv: Vec<String>,
}

impl SessionCommand {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_session_name(&self.runner) {
            return Err(format!("invalid runner name: {:?}", self.runner));
        }
        if self.argv.is_empty() {
            return Err("argv must not be empty".to_string());
        }
        Ok(())
    }
}
