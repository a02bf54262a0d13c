// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! WebSocket interactive shell protocol (spec §4.1, §6).

use hack_core::ShellStatus;
use serde::{Deserialize, Serialize};

/// Client -> server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellClientFrame {
    Hello { cols: u16, rows: u16 },
    Input { data: String },
    Resize { cols: u16, rows: u16 },
    Signal { signal: ShellSignal },
    Close,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShellSignal {
    Int,
    Term,
    Kill,
}

/// Server -> client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellServerFrame {
    Ready {
        shell_id: String,
        cols: u16,
        rows: u16,
        cwd: String,
        shell: String,
        status: ShellStatus,
    },
    Output {
        data: String,
    },
    Exit {
        exit_code: Option<i32>,
        signal: Option<String>,
    },
    Error {
        message: String,
    },
}
