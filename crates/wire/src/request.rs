// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Transport-independent operation requests (spec §4.1).
//!
//! The same `Request`/`Response` pair is used verbatim over the Unix
//! socket (length-prefixed JSON) and is reused for the shapes of the
//! HTTP/WS gateway's bodies, so a single `Router` implementation in
//! `hack-daemon` can serve both transports.

use std::collections::HashMap;

use hack_core::{JobId, ProjectId, ShellId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Status,
    Metrics,
    ListProjects {
        #[serde(default)]
        filter: Option<String>,
        #[serde(default)]
        include_global: bool,
        #[serde(default)]
        include_unregistered: bool,
    },
    Ps {
        compose_project: String,
        #[serde(default)]
        project: Option<String>,
        #[serde(default)]
        branch: Option<String>,
    },
    RegisterProject {
        name: String,
        dev_host: String,
        repo_root: String,
        config_dir: String,
    },
    UnregisterProject {
        id: ProjectId,
    },
    PruneProjects,
    CreateJob {
        project_id: ProjectId,
        runner: String,
        command: Vec<String>,
        working_dir: String,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    ListJobs {
        project_id: ProjectId,
    },
    GetJob {
        project_id: ProjectId,
        job_id: JobId,
    },
    CancelJob {
        project_id: ProjectId,
        job_id: JobId,
    },
    CreateShell {
        project_id: ProjectId,
        cols: u16,
        rows: u16,
        #[serde(default)]
        working_dir: Option<String>,
    },
    GetShell {
        project_id: ProjectId,
        shell_id: ShellId,
    },
}
