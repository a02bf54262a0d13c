// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Debounced runtime cache (spec §4.2): a single writer refreshes the
//! runtime snapshot; concurrent refresh requests coalesce into at most one
//! extra pass so a storm of callers never stampedes the runtime CLI.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use hack_core::{Clock, Project, ProjectId, RuntimeFingerprint, RuntimeProject};
use hack_registry::{AutoRegisterCandidate, RegistryStore};

use crate::backend::RuntimeBackend;
use crate::error::RuntimeError;
use crate::ps::{ps_payload, PsRow};
use crate::view::{project_view, ProjectsQuery};

#[derive(Debug, Clone, Default)]
pub struct RuntimeHealth {
    pub ok: bool,
    pub last_error: Option<String>,
    pub checked_at_ms: Option<i64>,
    pub reset_count: u64,
    pub last_reset_at_ms: Option<i64>,
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Vec<RuntimeProject>>,
    fingerprint: Option<RuntimeFingerprint>,
    health: RuntimeHealth,
}

struct RefreshGate {
    lock: Mutex<()>,
    pending: AtomicBool,
}

impl RefreshGate {
    fn new() -> Self {
        Self { lock: Mutex::new(()), pending: AtomicBool::new(false) }
    }

    /// Run `work` with at-most-one-in-flight coalescing. Callers that arrive
    /// while a refresh is already running mark `pending` and wait for the
    /// in-flight holder's loop to pick it up; they never run `work`
    /// themselves.
    async fn run<F, Fut>(&self, work: F) -> Option<Result<(), RuntimeError>>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), RuntimeError>>,
    {
        match self.lock.try_lock() {
            Ok(_guard) => {
                let mut result = Ok(());
                loop {
                    result = work().await;
                    if !self.pending.swap(false, Ordering::AcqRel) {
                        break;
                    }
                }
                Some(result)
            }
            Err(_) => {
                self.pending.store(true, Ordering::Release);
                let _guard = self.lock.lock().await;
                None
            }
        }
    }
}

pub struct RuntimeCache {
    backend: Arc<dyn RuntimeBackend>,
    registry: Arc<RegistryStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState>,
    gate: RefreshGate,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl RuntimeCache {
    pub fn new(backend: Arc<dyn RuntimeBackend>, registry: Arc<RegistryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            registry,
            clock,
            state: RwLock::new(CacheState::default()),
            gate: RefreshGate::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub async fn health(&self) -> RuntimeHealth {
        self.state.read().await.health.clone()
    }

    /// Coalesced refresh. `reason` is carried only for tracing.
    pub async fn refresh(&self, reason: &str) -> Result<(), RuntimeError> {
        let result = self.gate.run(|| self.do_refresh(reason)).await;
        result.unwrap_or(Ok(()))
    }

    async fn do_refresh(&self, reason: &str) -> Result<(), RuntimeError> {
        tracing::debug!(reason, "refreshing runtime cache");
        let now_ms = self.clock.now_ms();

        let inventory = match self.backend.inventory().await {
            Ok(inventory) => inventory,
            Err(e) => {
                let mut state = self.state.write().await;
                state.health.ok = false;
                state.health.last_error = Some(e.to_string());
                state.health.checked_at_ms = Some(now_ms);
                return Err(e);
            }
        };

        let identity = self.backend.identity().await;

        let candidates: Vec<AutoRegisterCandidate> = inventory
            .iter()
            .filter_map(|rp| {
                let config_dir = rp.labels.config_dir.clone()?;
                let repo_root = rp.labels.repo_root.clone().unwrap_or_else(|| config_dir.clone());
                Some(AutoRegisterCandidate {
                    name: rp.labels.project_name.clone().unwrap_or_else(|| rp.compose_project.clone()),
                    dev_host: rp.labels.dev_host.clone().unwrap_or_else(|| "localhost".to_string()),
                    repo_root,
                    config_dir,
                })
            })
            .collect();

        let clock = self.clock.clone();
        if !candidates.is_empty() {
            let _ = self.registry.with_lock(|doc| doc.auto_register(&candidates, clock.as_ref()));
        }

        let mut state = self.state.write().await;
        state.snapshot = Some(inventory);
        state.health.ok = true;
        state.health.last_error = None;
        state.health.checked_at_ms = Some(now_ms);

        if let Ok(fingerprint) = identity {
            if let Some(previous) = &state.fingerprint {
                if hack_core::detect_reset(previous, &fingerprint) {
                    state.health.reset_count += 1;
                    state.health.last_reset_at_ms = Some(now_ms);
                }
            }
            state.fingerprint = Some(fingerprint);
        }

        Ok(())
    }

    /// Lazily refreshes if no snapshot exists yet, then projects the view.
    pub async fn projects_payload(
        &self,
        filter: Option<&str>,
        include_global: bool,
        include_unregistered: bool,
    ) -> Result<Vec<hack_core::ProjectView>, RuntimeError> {
        let has_snapshot = self.state.read().await.snapshot.is_some();
        if has_snapshot {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
            self.refresh("lazy").await?;
        }

        let registry = self.registry.snapshot().map_err(|e| RuntimeError::Unreachable(e.to_string()))?;
        let state = self.state.read().await;
        let snapshot = state.snapshot.clone().unwrap_or_default();
        let runtime_ok = state.health.ok;
        drop(state);

        let compose_yaml = self.read_compose_files(&registry.projects).await;

        Ok(project_view(
            &registry.projects,
            &snapshot,
            &compose_yaml,
            runtime_ok,
            ProjectsQuery { filter, include_global, include_unregistered },
        ))
    }

    pub async fn ps_payload(&self, compose_project: &str) -> Vec<PsRow> {
        let state = self.state.read().await;
        let snapshot = state.snapshot.clone().unwrap_or_default();
        ps_payload(&snapshot, compose_project)
    }

    async fn read_compose_files(&self, projects: &[Project]) -> HashMap<ProjectId, String> {
        let mut out = HashMap::new();
        for project in projects {
            let compose_path = hack_config::paths::ProjectPaths::new(&project.repo_root).compose_file();
            if let Some(contents) = read_if_present(&compose_path).await {
                out.insert(project.id.clone(), contents);
            }
        }
        out
    }
}

async fn read_if_present(path: &Path) -> Option<String> {
    tokio::fs::read_to_string(path).await.ok()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hack_core::{FakeClock, RuntimeLabels};

    use crate::backend::FakeRuntimeBackend;

    use super::*;

    fn new_cache(dir: &std::path::Path) -> (RuntimeCache, Arc<FakeRuntimeBackend>) {
        let backend = Arc::new(FakeRuntimeBackend::new());
        let registry = Arc::new(RegistryStore::new(dir.join("projects.json"), dir.join("projects.json.lock")));
        let clock = Arc::new(FakeClock::new(1_000));
        (RuntimeCache::new(backend.clone(), registry, clock), backend)
    }

    #[tokio::test]
    async fn refresh_failure_marks_health_unhealthy_and_retains_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, backend) = new_cache(dir.path());
        backend.set_inventory(vec![RuntimeProject {
            compose_project: "widgets".into(),
            working_dir: None,
            services: BTreeMap::new(),
            labels: RuntimeLabels::default(),
        }]);
        cache.refresh("initial").await.unwrap();
        assert!(cache.health().await.ok);

        backend.fail_next_inventory("docker unreachable");
        assert!(cache.refresh("retry").await.is_err());
        let health = cache.health().await;
        assert!(!health.ok);
        assert_eq!(health.last_error.as_deref(), Some("runtime CLI unreachable: docker unreachable"));

        let snapshot = cache.state.read().await.snapshot.clone();
        assert_eq!(snapshot.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn auto_registers_labeled_projects_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, backend) = new_cache(dir.path());
        backend.set_inventory(vec![RuntimeProject {
            compose_project: "widgets".into(),
            working_dir: None,
            services: BTreeMap::new(),
            labels: RuntimeLabels {
                project_name: Some("widgets".into()),
                dev_host: Some("widgets.dev".into()),
                repo_root: Some("/repos/widgets".into()),
                config_dir: Some("/repos/widgets/.hack".into()),
            },
        }]);
        cache.refresh("initial").await.unwrap();

        let registry = cache.registry.snapshot().unwrap();
        assert_eq!(registry.projects.len(), 1);
        assert_eq!(registry.projects[0].name, "widgets");
    }

    #[tokio::test]
    async fn projects_payload_lazily_refreshes_once() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _backend) = new_cache(dir.path());
        let _ = cache.projects_payload(None, true, false).await.unwrap();
        assert_eq!(cache.cache_misses(), 1);
        let _ = cache.projects_payload(None, true, false).await.unwrap();
        assert_eq!(cache.cache_hits(), 1);
    }
}
