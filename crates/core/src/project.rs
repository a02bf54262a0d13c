// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Project, runtime-project, and branch-instance data model (spec §3).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::ProjectId;
use crate::slug::split_branch_compose_name;

/// A registry entry: the durable record of a project this workstation knows
/// about. Created on first registration or auto-registration; updated on
/// every successful command targeting it; removed only by explicit prune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Unique display name (slug).
    pub name: String,
    pub dev_host: String,
    pub repo_root: PathBuf,
    pub config_dir: PathBuf,
    pub created_at_ms: i64,
    pub last_seen_at_ms: i64,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        dev_host: impl Into<String>,
        repo_root: PathBuf,
        config_dir: PathBuf,
        now_ms: i64,
    ) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            dev_host: dev_host.into(),
            repo_root,
            config_dir,
            created_at_ms: now_ms,
            last_seen_at_ms: now_ms,
        }
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.last_seen_at_ms = now_ms;
    }

    /// A project is prunable once both its repo root and config directory
    /// are gone from disk (spec §4.5 prune rule; the "no live containers"
    /// half of that rule is evaluated by the caller against the runtime
    /// snapshot, since this type has no runtime knowledge).
    pub fn paths_missing(&self) -> bool {
        !self.repo_root.exists() && !self.config_dir.exists()
    }
}

/// One container in a runtime project's service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub status: String,
    pub ports: Vec<String>,
}

/// Container labels advertising where a project's on-disk config lives,
/// used to drive auto-registration (spec §4.5).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeLabels {
    pub project_name: Option<String>,
    pub dev_host: Option<String>,
    pub repo_root: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
}

/// A transient projection of the container runtime's current state for one
/// compose project. Rebuilt on every poll; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeProject {
    pub compose_project: String,
    pub working_dir: Option<PathBuf>,
    pub services: BTreeMap<String, Vec<ContainerStatus>>,
    #[serde(default)]
    pub labels: RuntimeLabels,
}

impl RuntimeProject {
    pub fn is_running(&self) -> bool {
        self.services.values().flatten().any(|c| c.status == "running")
    }

    /// If this runtime project's compose-project name has the
    /// `<base>--<branch>` shape, return the decomposed branch instance.
    pub fn as_branch_instance(&self) -> Option<BranchInstance> {
        let (base, branch) = split_branch_compose_name(&self.compose_project)?;
        Some(BranchInstance {
            base: base.to_string(),
            branch: branch.to_string(),
            compose_project: self.compose_project.clone(),
        })
    }
}

/// A derived runtime project whose compose-project name is `<base>--<branch>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInstance {
    pub base: String,
    pub branch: String,
    pub compose_project: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(status: &str) -> ContainerStatus {
        ContainerStatus { name: "web-1".into(), status: status.into(), ports: vec![] }
    }

    fn runtime_project(compose_project: &str, services: BTreeMap<String, Vec<ContainerStatus>>) -> RuntimeProject {
        RuntimeProject {
            compose_project: compose_project.into(),
            working_dir: None,
            services,
            labels: RuntimeLabels::default(),
        }
    }

    #[test]
    fn running_iff_any_container_running() {
        let mut services = BTreeMap::new();
        services.insert("web".to_string(), vec![container("exited")]);
        let rp = runtime_project("widgets", services);
        assert!(!rp.is_running());

        let mut services = BTreeMap::new();
        services.insert("web".to_string(), vec![container("running")]);
        let rp = runtime_project("widgets", services);
        assert!(rp.is_running());
    }

    #[test]
    fn branch_instance_detection() {
        let rp = runtime_project("widgets--feature-1", BTreeMap::new());
        let branch = rp.as_branch_instance().expect("branch instance");
        assert_eq!(branch.base, "widgets");
        assert_eq!(branch.branch, "feature-1");

        let base_rp = runtime_project("widgets", BTreeMap::new());
        assert!(base_rp.as_branch_instance().is_none());
    }
}
