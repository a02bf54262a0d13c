// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Runtime identity fingerprint and reset detection (spec §3, §4.2).

use serde::{Deserialize, Serialize};

/// `(runtimeHost, socketPath, socketInode, engineId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeFingerprint {
    pub runtime_host: String,
    pub socket_path: String,
    pub socket_inode: u64,
    pub engine_id: Option<String>,
}

const SEP: char = '|';

impl RuntimeFingerprint {
    /// Stable concatenation of the four components. A missing/"unknown"
    /// `engine_id` never participates in reset detection (spec §4.2), but it
    /// is still part of the canonical string so unrelated fields still
    /// distinguish fingerprints.
    pub fn as_string(&self) -> String {
        format!(
            "{}{SEP}{}{SEP}{}{SEP}{}",
            self.runtime_host,
            self.socket_path,
            self.socket_inode,
            self.engine_id.as_deref().unwrap_or("unknown"),
        )
    }

    fn engine_observed(&self) -> bool {
        match self.engine_id.as_deref() {
            None | Some("unknown") | Some("") => false,
            Some(_) => true,
        }
    }
}

/// Returns `true` when `previous -> current` constitutes a reset: every
/// component must be observed (a null/"unknown" `engine_id` never triggers
/// one), and the canonical string must differ.
pub fn detect_reset(previous: &RuntimeFingerprint, current: &RuntimeFingerprint) -> bool {
    if !previous.engine_observed() || !current.engine_observed() {
        return false;
    }
    previous.as_string() != current.as_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(engine_id: Option<&str>) -> RuntimeFingerprint {
        RuntimeFingerprint {
            runtime_host: "unix:///var/run/docker.sock".into(),
            socket_path: "/var/run/docker.sock".into(),
            socket_inode: 42,
            engine_id: engine_id.map(str::to_string),
        }
    }

    #[test]
    fn identical_fingerprints_are_stable() {
        assert_eq!(fp(Some("A")).as_string(), fp(Some("A")).as_string());
        assert!(!detect_reset(&fp(Some("A")), &fp(Some("A"))));
    }

    #[test]
    fn engine_id_change_is_a_reset() {
        assert!(detect_reset(&fp(Some("A")), &fp(Some("B"))));
    }

    #[test]
    fn unknown_engine_id_never_triggers_reset() {
        assert!(!detect_reset(&fp(Some("A")), &fp(None)));
        assert!(!detect_reset(&fp(None), &fp(Some("A"))));
        assert!(!detect_reset(&fp(Some("unknown")), &fp(Some("A"))));
    }

    #[test]
    fn third_poll_with_same_engine_does_not_reset() {
        let p1 = fp(Some("A"));
        let p2 = fp(Some("B"));
        let p3 = fp(Some("B"));
        assert!(detect_reset(&p1, &p2));
        assert!(!detect_reset(&p2, &p3));
    }
}
