// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Project view projection (spec §4.6): the pure cross-join of registry,
//! runtime snapshot, and already-read compose file contents. No I/O beyond
//! the parse itself, which is why `compose_yaml` is passed in pre-read
//! rather than read from disk here.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use hack_core::{Project, ProjectId, ProjectView, RuntimeProject, RuntimeStatus};

use crate::compose::parse_compose;

/// A registry entry named exactly `"global"` is the shared ingress/CA
/// project created by `hack global install`; `include_global = false`
/// omits it from the returned list (undefined by spec §4.6, resolved here).
const GLOBAL_PROJECT_NAME: &str = "global";

#[derive(Debug, Clone, Copy)]
pub struct ProjectsQuery<'a> {
    pub filter: Option<&'a str>,
    pub include_global: bool,
    pub include_unregistered: bool,
}

pub fn project_view(
    registry: &[Project],
    runtime_snapshot: &[RuntimeProject],
    compose_yaml: &HashMap<ProjectId, String>,
    runtime_ok: bool,
    query: ProjectsQuery<'_>,
) -> Vec<ProjectView> {
    let mut rows = Vec::new();

    for project in registry {
        if !query.include_global && project.name == GLOBAL_PROJECT_NAME {
            continue;
        }
        if let Some(filter) = query.filter {
            if project.name != filter {
                continue;
            }
        }

        let runtime_project = runtime_snapshot.iter().find(|rp| rp.compose_project == project.name);
        let compose_contents = compose_yaml.get(&project.id);
        let runtime_configured = compose_contents.is_some();
        let (defined_services, extensions_enabled) = compose_contents
            .and_then(|yaml| parse_compose(yaml))
            .map(|(services, ext)| (Some(services), ext))
            .unwrap_or((None, false));

        let runtime_status = if !runtime_configured {
            RuntimeStatus::NotConfigured
        } else if project.paths_missing() {
            RuntimeStatus::Missing
        } else if !runtime_ok {
            RuntimeStatus::Unknown
        } else {
            match runtime_project {
                Some(rp) if rp.is_running() => RuntimeStatus::Running,
                _ => RuntimeStatus::Stopped,
            }
        };

        let branch_runtime = runtime_snapshot
            .iter()
            .filter_map(|rp| rp.as_branch_instance())
            .filter(|b| b.base == project.name)
            .collect();

        rows.push(ProjectView {
            id: project.id.clone(),
            name: project.name.clone(),
            dev_host: project.dev_host.clone(),
            repo_root: project.repo_root.clone(),
            config_dir: project.config_dir.clone(),
            created_at_ms: project.created_at_ms,
            last_seen_at_ms: project.last_seen_at_ms,
            defined_services,
            extensions_enabled,
            runtime_configured,
            runtime_status,
            branch_runtime,
            runtime_ok,
        });
    }

    if query.include_unregistered {
        let registered_names: HashSet<&str> = registry.iter().map(|p| p.name.as_str()).collect();
        for rp in runtime_snapshot {
            if registered_names.contains(rp.compose_project.as_str()) {
                continue;
            }
            if rp.as_branch_instance().is_some() {
                continue;
            }
            if let Some(filter) = query.filter {
                if rp.compose_project != filter {
                    continue;
                }
            }
            rows.push(ProjectView {
                id: ProjectId::from_string(format!("unregistered:{}", rp.compose_project)),
                name: rp.compose_project.clone(),
                dev_host: String::new(),
                repo_root: rp.working_dir.clone().unwrap_or_default(),
                config_dir: PathBuf::new(),
                created_at_ms: 0,
                last_seen_at_ms: 0,
                defined_services: None,
                extensions_enabled: false,
                runtime_configured: false,
                runtime_status: if rp.is_running() { RuntimeStatus::Running } else { RuntimeStatus::Stopped },
                branch_runtime: Vec::new(),
                runtime_ok,
            });
        }
    }

    rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    rows
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hack_core::{ContainerStatus, FakeClock, RuntimeLabels};

    use super::*;

    fn project(name: &str, clock: &FakeClock) -> Project {
        Project::new(name, "dev.local", PathBuf::from(format!("/r/{name}")), PathBuf::from(format!("/r/{name}/.hack")), clock.now_ms())
    }

    fn running_rp(compose_project: &str) -> RuntimeProject {
        let mut services = BTreeMap::new();
        services.insert(
            "web".to_string(),
            vec![ContainerStatus { name: "web-1".into(), status: "running".into(), ports: vec![] }],
        );
        RuntimeProject { compose_project: compose_project.into(), working_dir: None, services, labels: RuntimeLabels::default() }
    }

    #[test]
    fn sorts_case_insensitively_by_name() {
        let clock = FakeClock::new(0);
        let registry = vec![project("Zed", &clock), project("apple", &clock)];
        let rows = project_view(
            &registry,
            &[],
            &HashMap::new(),
            true,
            ProjectsQuery { filter: None, include_global: true, include_unregistered: false },
        );
        assert_eq!(rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["apple", "Zed"]);
    }

    #[test]
    fn unconfigured_project_is_not_configured_regardless_of_runtime() {
        let clock = FakeClock::new(0);
        let registry = vec![project("widgets", &clock)];
        let rows = project_view(
            &registry,
            &[running_rp("widgets")],
            &HashMap::new(),
            true,
            ProjectsQuery { filter: None, include_global: true, include_unregistered: false },
        );
        assert_eq!(rows[0].runtime_status, RuntimeStatus::NotConfigured);
    }

    #[test]
    fn configured_and_running_project_reports_running() {
        let clock = FakeClock::new(0);
        let registry = vec![project("widgets", &clock)];
        let mut compose = HashMap::new();
        compose.insert(registry[0].id.clone(), "services:\n  web:\n    image: nginx\n".to_string());
        let rows = project_view(
            &registry,
            &[running_rp("widgets")],
            &compose,
            true,
            ProjectsQuery { filter: None, include_global: true, include_unregistered: false },
        );
        assert_eq!(rows[0].runtime_status, RuntimeStatus::Running);
        assert_eq!(rows[0].defined_services, Some(vec!["web".to_string()]));
    }

    #[test]
    fn failed_runtime_poll_yields_unknown_status_for_configured_projects() {
        let clock = FakeClock::new(0);
        let registry = vec![project("widgets", &clock)];
        let mut compose = HashMap::new();
        compose.insert(registry[0].id.clone(), "services: {}\n".to_string());
        let rows = project_view(
            &registry,
            &[],
            &compose,
            false,
            ProjectsQuery { filter: None, include_global: true, include_unregistered: false },
        );
        assert_eq!(rows[0].runtime_status, RuntimeStatus::Unknown);
    }

    #[test]
    fn excludes_global_project_unless_requested() {
        let clock = FakeClock::new(0);
        let registry = vec![project("global", &clock), project("widgets", &clock)];
        let rows = project_view(
            &registry,
            &[],
            &HashMap::new(),
            true,
            ProjectsQuery { filter: None, include_global: false, include_unregistered: false },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "widgets");
    }

    #[test]
    fn includes_unregistered_runtime_projects_when_requested() {
        let rows = project_view(
            &[],
            &[running_rp("orphan")],
            &HashMap::new(),
            true,
            ProjectsQuery { filter: None, include_global: true, include_unregistered: true },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "orphan");
    }

    #[test]
    fn branch_instances_are_attached_to_their_base_not_listed_unregistered() {
        let clock = FakeClock::new(0);
        let registry = vec![project("widgets", &clock)];
        let mut compose = HashMap::new();
        compose.insert(registry[0].id.clone(), "services:\n  web:\n    image: nginx\n".to_string());
        let rows = project_view(
            &registry,
            &[running_rp("widgets"), running_rp("widgets--feature-1")],
            &compose,
            true,
            ProjectsQuery { filter: None, include_global: true, include_unregistered: true },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].branch_runtime.len(), 1);
        assert_eq!(rows[0].branch_runtime[0].branch, "feature-1");
    }
}
