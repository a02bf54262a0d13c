// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Atomic file replace: write-to-temp-then-rename (spec §4.5, §6).

use std::io::Write;
use std::path::Path;

use hack_core::{ErrorKind, HackError};

/// Write `contents` to `path` atomically: a temp file in the same
/// directory is written and fsynced, then renamed over the destination.
/// A reader never observes a partially-written file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), HackError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| HackError::new(ErrorKind::Fatal, format!("create_dir_all {dir:?}: {e}")))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| HackError::new(ErrorKind::Fatal, format!("create temp file in {dir:?}: {e}")))?;
    tmp.write_all(contents)
        .map_err(|e| HackError::new(ErrorKind::Fatal, format!("write temp file: {e}")))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| HackError::new(ErrorKind::Fatal, format!("fsync temp file: {e}")))?;
    tmp.persist(path)
        .map_err(|e| HackError::new(ErrorKind::Fatal, format!("rename into {path:?}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sub/file.json");
        atomic_write(&path, b"{\"a\":1}").expect("write");
        assert_eq!(std::fs::read(&path).expect("read"), b"{\"a\":1}");

        atomic_write(&path, b"{\"a\":2}").expect("overwrite");
        assert_eq!(std::fs::read(&path).expect("read"), b"{\"a\":2}");
    }
}
