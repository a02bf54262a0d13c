// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Project view: the cross-join of registry + runtime + on-disk config
//! (spec §3, §4.6). The projection logic lives in `hack-runtime`; this
//! module only holds the shape, since it is a core data-model type multiple
//! crates need to name.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::ProjectId;
use crate::project::BranchInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    Running,
    Stopped,
    Missing,
    Unknown,
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: ProjectId,
    pub name: String,
    pub dev_host: String,
    pub repo_root: PathBuf,
    pub config_dir: PathBuf,
    pub created_at_ms: i64,
    pub last_seen_at_ms: i64,
    /// `None` when the compose file failed to parse or extensions are off;
    /// never an error (spec §4.6: "never throw").
    pub defined_services: Option<Vec<String>>,
    pub extensions_enabled: bool,
    pub runtime_configured: bool,
    pub runtime_status: RuntimeStatus,
    pub branch_runtime: Vec<BranchInstance>,
    /// Attached by the runtime cache: false when the last poll failed.
    pub runtime_ok: bool,
}
