// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! The pure, lock-free core of the registry: a versioned document plus the
//! mutations spec §4.5 describes. Kept free of any I/O so S1-style
//! concurrency tests can exercise it without touching disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use hack_core::{Clock, Project, ProjectId};

use crate::error::RegistryError;

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub projects: Vec<Project>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

/// A runtime-observed project whose container labels advertise an on-disk
/// config directory, used to drive auto-registration (spec §4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct AutoRegisterCandidate {
    pub name: String,
    pub dev_host: String,
    pub repo_root: PathBuf,
    pub config_dir: PathBuf,
}

impl RegistryDocument {
    pub fn new() -> Self {
        Self { version: CURRENT_VERSION, projects: Vec::new() }
    }

    pub fn find(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Register a new project. Fails with [`RegistryError::DuplicateName`]
    /// if the name is already taken (names are unique within the registry).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        dev_host: impl Into<String>,
        repo_root: PathBuf,
        config_dir: PathBuf,
        clock: &dyn Clock,
    ) -> Result<Project, RegistryError> {
        let name = name.into();
        if self.find_by_name(&name).is_some() {
            return Err(RegistryError::DuplicateName(name));
        }
        let project = Project::new(name, dev_host, repo_root, config_dir, clock.now_ms());
        self.projects.push(project.clone());
        Ok(project)
    }

    pub fn unregister(&mut self, id: &ProjectId) -> Result<Project, RegistryError> {
        let idx = self
            .projects
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(self.projects.remove(idx))
    }

    pub fn touch(&mut self, id: &ProjectId, clock: &dyn Clock) {
        if let Some(project) = self.projects.iter_mut().find(|p| &p.id == id) {
            project.touch(clock.now_ms());
        }
    }

    /// Auto-register every candidate not already present by config directory,
    /// minting a fresh id for each (spec §9 Open Question 3: never reuse a
    /// pruned project's id). Returns the newly created entries.
    pub fn auto_register(
        &mut self,
        candidates: &[AutoRegisterCandidate],
        clock: &dyn Clock,
    ) -> Vec<Project> {
        let mut created = Vec::new();
        for candidate in candidates {
            let already_known =
                self.projects.iter().any(|p| p.config_dir == candidate.config_dir);
            if already_known {
                continue;
            }
            let mut name = candidate.name.clone();
            let mut suffix = 1u32;
            while self.find_by_name(&name).is_some() {
                suffix += 1;
                name = format!("{}-{suffix}", candidate.name);
            }
            let project = Project::new(
                name,
                candidate.dev_host.clone(),
                candidate.repo_root.clone(),
                candidate.config_dir.clone(),
                clock.now_ms(),
            );
            self.projects.push(project.clone());
            created.push(project);
        }
        created
    }

    /// Remove entries whose repo root and config directory are both gone
    /// from disk and whose compose-project has no live containers (spec
    /// §4.5 prune rule). `is_running` is supplied by the caller since this
    /// crate has no runtime knowledge.
    pub fn prune(&mut self, is_running: impl Fn(&Project) -> bool) -> Vec<ProjectId> {
        let mut removed = Vec::new();
        self.projects.retain(|project| {
            let prunable = project.paths_missing() && !is_running(project);
            if prunable {
                removed.push(project.id.clone());
            }
            !prunable
        });
        removed
    }
}
