// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Small helpers for keeping a project's `.gitignore` in sync with the
//! paths hack writes under `<repo>/.hack/` (spec §4, §6).

use std::path::Path;

use hack_core::{ErrorKind, HackError};

use crate::atomic::atomic_write;

/// Ensure `pattern` appears as its own line in the `.gitignore` at `path`,
/// creating the file if needed. Idempotent: a pattern already present is
/// left untouched and the file is not rewritten.
pub fn ensure_ignored(path: &Path, pattern: &str) -> Result<bool, HackError> {
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(false);
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(pattern);
    updated.push('\n');

    atomic_write(path, updated.as_bytes())
        .map_err(|e| HackError::new(ErrorKind::Fatal, format!("write {path:?}: {e}")))?;
    Ok(true)
}
