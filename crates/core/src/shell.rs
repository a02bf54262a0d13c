// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! PTY-backed shell data model (spec §3, §4.3).

use serde::{Deserialize, Serialize};

use crate::id::{ProjectId, ShellId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellStatus {
    Starting,
    Running,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shell {
    pub id: ShellId,
    pub project_id: ProjectId,
    pub cols: u16,
    pub rows: u16,
    pub working_dir: String,
    pub shell_program: String,
    pub status: ShellStatus,
    pub created_at_ms: i64,
}

impl Shell {
    pub fn new(
        project_id: ProjectId,
        cols: u16,
        rows: u16,
        working_dir: impl Into<String>,
        shell_program: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: ShellId::new(),
            project_id,
            cols,
            rows,
            working_dir: working_dir.into(),
            shell_program: shell_program.into(),
            status: ShellStatus::Starting,
            created_at_ms: now_ms,
        }
    }
}
