// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Transport-independent operation responses (spec §4.1).

use hack_core::ProjectId;
use serde::{Deserialize, Serialize};

use crate::dto::{JobSummary, ProjectViewDto, ShellSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsEntry {
    pub service: String,
    pub name: String,
    pub status: String,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Status { status: String, uptime_ms: u64, version: String },
    Metrics { cache_hits: u64, cache_misses: u64, active_streams: u64, last_refresh_ms: Option<i64> },
    Projects { projects: Vec<ProjectViewDto> },
    Ps { items: Vec<PsEntry> },
    ProjectRegistered { project: ProjectViewDto },
    ProjectUnregistered { id: ProjectId },
    ProjectsPruned { removed: Vec<ProjectId> },
    Job { job: JobSummary },
    Jobs { jobs: Vec<JobSummary> },
    JobCancelRequested { job_id: hack_core::JobId },
    Shell { shell: ShellSummary },
    Error { code: String, message: String, retryable: bool },
}
