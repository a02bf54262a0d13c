// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! WebSocket job stream protocol (spec §4.1, §6).

use hack_core::JobStatus;
use serde::{Deserialize, Serialize};

/// Client -> server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobStreamClientFrame {
    Hello { logs_from: u64, events_from: u64 },
}

/// Server -> client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobStreamServerFrame {
    Ready,
    Log { offset: u64, data: String },
    Event { seq: u64, kind: JobEventKind, logs_offset: u64, events_seq: u64 },
    Heartbeat { logs_offset: u64, events_seq: u64 },
    Error { message: String },
    End,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobEventKind {
    Created,
    Started,
    Stdout,
    Stderr,
    Completed,
    Failed,
    Canceled,
    Heartbeat,
}

impl JobEventKind {
    pub fn terminal_status(self) -> Option<JobStatus> {
        match self {
            JobEventKind::Completed => Some(JobStatus::Completed),
            JobEventKind::Failed => Some(JobStatus::Failed),
            JobEventKind::Canceled => Some(JobStatus::Canceled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_frame_round_trips() {
        let frame = JobStreamClientFrame::Hello { logs_from: 10, events_from: 2 };
        let json = serde_json::to_string(&frame).expect("serialize");
        assert_eq!(json, r#"{"type":"hello","logs_from":10,"events_from":2}"#);
        let back: JobStreamClientFrame = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, frame);
    }

    #[test]
    fn heartbeat_frame_carries_the_current_cursor() {
        let frame = JobStreamServerFrame::Heartbeat { logs_offset: 512, events_seq: 7 };
        let json = serde_json::to_string(&frame).expect("serialize");
        assert_eq!(json, r#"{"type":"heartbeat","logs_offset":512,"events_seq":7}"#);
    }
}
