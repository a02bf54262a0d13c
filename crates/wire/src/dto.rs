// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Response DTOs shared by the socket and HTTP transports.

use hack_core::{BranchInstance, JobId, JobStatus, ProjectId, ProjectView, RuntimeStatus, ShellId, ShellStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectViewDto {
    pub id: String,
    pub name: String,
    pub dev_host: String,
    pub repo_root: String,
    pub config_dir: String,
    pub created_at_ms: i64,
    pub last_seen_at_ms: i64,
    pub defined_services: Option<Vec<String>>,
    pub extensions_enabled: bool,
    pub runtime_configured: bool,
    pub runtime_status: RuntimeStatus,
    pub branch_runtime: Vec<BranchInstance>,
    pub runtime_ok: bool,
}

impl From<&ProjectView> for ProjectViewDto {
    fn from(v: &ProjectView) -> Self {
        Self {
            id: v.id.to_string(),
            name: v.name.clone(),
            dev_host: v.dev_host.clone(),
            repo_root: v.repo_root.display().to_string(),
            config_dir: v.config_dir.display().to_string(),
            created_at_ms: v.created_at_ms,
            last_seen_at_ms: v.last_seen_at_ms,
            defined_services: v.defined_services.clone(),
            extensions_enabled: v.extensions_enabled,
            runtime_configured: v.runtime_configured,
            runtime_status: v.runtime_status,
            branch_runtime: v.branch_runtime.clone(),
            runtime_ok: v.runtime_ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub project_id: ProjectId,
    pub status: JobStatus,
    pub command: Vec<String>,
    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub ended_at_ms: Option<i64>,
    pub exit_code: Option<i32>,
    pub logs_offset: u64,
    pub events_seq: u64,
}

impl From<&hack_core::Job> for JobSummary {
    fn from(j: &hack_core::Job) -> Self {
        Self {
            id: j.id.clone(),
            project_id: j.project_id.clone(),
            status: j.status,
            command: j.command.clone(),
            created_at_ms: j.created_at_ms,
            started_at_ms: j.started_at_ms,
            ended_at_ms: j.ended_at_ms,
            exit_code: j.exit_code,
            logs_offset: j.logs_offset,
            events_seq: j.events_seq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellSummary {
    pub id: ShellId,
    pub project_id: ProjectId,
    pub cols: u16,
    pub rows: u16,
    pub status: ShellStatus,
}

impl From<&hack_core::Shell> for ShellSummary {
    fn from(s: &hack_core::Shell) -> Self {
        Self { id: s.id.clone(), project_id: s.project_id.clone(), cols: s.cols, rows: s.rows, status: s.status }
    }
}
