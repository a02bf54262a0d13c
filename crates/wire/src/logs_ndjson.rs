// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! NDJSON envelope for the `GET /logs` HTTP streaming endpoint (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEnvelope {
    Start { project: String, backend: String },
    Log { ts: i64, project: String, backend: String, entry: String },
    Heartbeat { ts: i64 },
    Error { ts: i64, message: String },
    End { ts: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_envelope_is_one_json_object_per_line() {
        let envelope = LogEnvelope::Log {
            ts: 1000,
            project: "widgets".to_string(),
            backend: "docker".to_string(),
            entry: "listening on :8080".to_string(),
        };
        let line = serde_json::to_string(&envelope).expect("serialize");
        assert!(!line.contains('\n'));
        let back: LogEnvelope = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(back, envelope);
    }
}
