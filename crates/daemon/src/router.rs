// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! The transport-independent `Router`: one async method per `hack_wire::Request`
//! variant, shared verbatim by the Unix socket listener and the HTTP/WS
//! gateway. Neither transport owns any domain logic; both just frame a
//! `Request` in, and serialize a `Response` (or a `DaemonError`) out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hack_core::{Clock, ProjectId};
use hack_registry::RegistryStore;
use hack_runtime::RuntimeCache;
use hack_supervisor::{JobSpec, JobSupervisor, ShellSupervisor};
use hack_wire::{JobSummary, ProjectViewDto, PsEntry, Request, Response, ShellSummary};

use crate::error::DaemonError;

/// The version string reported by `Request::Status`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Router {
    pub registry: Arc<RegistryStore>,
    pub runtime: Arc<RuntimeCache>,
    pub jobs: Arc<JobSupervisor>,
    pub shells: Arc<ShellSupervisor>,
    pub clock: Arc<dyn Clock>,
    started_at: Instant,
    active_streams: AtomicU64,
}

impl Router {
    pub fn new(
        registry: Arc<RegistryStore>,
        runtime: Arc<RuntimeCache>,
        jobs: Arc<JobSupervisor>,
        shells: Arc<ShellSupervisor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            runtime,
            jobs,
            shells,
            clock,
            started_at: Instant::now(),
            active_streams: AtomicU64::new(0),
        }
    }

    /// A stream (job log/event tail, interactive shell) increments this on
    /// attach and must decrement it on detach, including on error paths —
    /// callers should hold the returned guard for the stream's lifetime.
    pub fn enter_stream(&self) -> StreamGuard<'_> {
        self.active_streams.fetch_add(1, Ordering::Relaxed);
        StreamGuard { router: self }
    }

    pub async fn dispatch(&self, request: Request) -> Result<Response, DaemonError> {
        match request {
            Request::Status => self.status(),
            Request::Metrics => self.metrics().await,
            Request::ListProjects { filter, include_global, include_unregistered } => {
                self.list_projects(filter, include_global, include_unregistered).await
            }
            Request::Ps { compose_project, project: _, branch: _ } => self.ps(&compose_project).await,
            Request::RegisterProject { name, dev_host, repo_root, config_dir } => {
                self.register_project(name, dev_host, repo_root, config_dir).await
            }
            Request::UnregisterProject { id } => self.unregister_project(id),
            Request::PruneProjects => self.prune_projects().await,
            Request::CreateJob { project_id, runner, command, working_dir, env } => {
                self.create_job(project_id, runner, command, working_dir, env)
            }
            Request::ListJobs { project_id } => self.list_jobs(project_id),
            Request::GetJob { project_id, job_id } => self.get_job(project_id, job_id),
            Request::CancelJob { project_id, job_id } => self.cancel_job(project_id, job_id),
            Request::CreateShell { project_id, cols, rows, working_dir } => {
                self.create_shell(project_id, cols, rows, working_dir)
            }
            Request::GetShell { project_id, shell_id } => self.get_shell(project_id, shell_id),
        }
    }

    fn status(&self) -> Result<Response, DaemonError> {
        let uptime_ms = u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(Response::Status { status: "running".to_string(), uptime_ms, version: VERSION.to_string() })
    }

    async fn metrics(&self) -> Result<Response, DaemonError> {
        let health = self.runtime.health().await;
        Ok(Response::Metrics {
            cache_hits: self.runtime.cache_hits(),
            cache_misses: self.runtime.cache_misses(),
            active_streams: self.active_streams.load(Ordering::Relaxed),
            last_refresh_ms: health.checked_at_ms,
        })
    }

    async fn list_projects(
        &self,
        filter: Option<String>,
        include_global: bool,
        include_unregistered: bool,
    ) -> Result<Response, DaemonError> {
        let views = self.runtime.projects_payload(filter.as_deref(), include_global, include_unregistered).await?;
        Ok(Response::Projects { projects: views.iter().map(ProjectViewDto::from).collect() })
    }

    async fn ps(&self, compose_project: &str) -> Result<Response, DaemonError> {
        let rows = self.runtime.ps_payload(compose_project).await;
        Ok(Response::Ps {
            items: rows
                .into_iter()
                .map(|r| PsEntry { service: r.service, name: r.name, status: r.status, ports: r.ports })
                .collect(),
        })
    }

    async fn register_project(
        &self,
        name: String,
        dev_host: String,
        repo_root: String,
        config_dir: String,
    ) -> Result<Response, DaemonError> {
        let clock = self.clock.clone();
        let project = self
            .registry
            .with_lock(move |doc| doc.register(name, dev_host, repo_root.into(), config_dir.into(), clock.as_ref()))??;

        let views = self.runtime.projects_payload(Some(&project.name), true, false).await?;
        let view = views
            .into_iter()
            .find(|v| v.id == project.id)
            .ok_or_else(|| DaemonError::Validation("registered project vanished before projection".to_string()))?;
        Ok(Response::ProjectRegistered { project: ProjectViewDto::from(&view) })
    }

    fn unregister_project(&self, id: ProjectId) -> Result<Response, DaemonError> {
        self.registry.with_lock(|doc| doc.unregister(&id))??;
        Ok(Response::ProjectUnregistered { id })
    }

    async fn prune_projects(&self) -> Result<Response, DaemonError> {
        let snapshot = self.registry.snapshot()?;
        let mut running: HashSet<ProjectId> = HashSet::new();
        for project in &snapshot.projects {
            let rows = self.runtime.ps_payload(&project.name).await;
            if rows.iter().any(|r| r.status == "running") {
                running.insert(project.id.clone());
            }
        }
        let removed = self.registry.with_lock(|doc| doc.prune(|p| running.contains(&p.id)))?;
        Ok(Response::ProjectsPruned { removed })
    }

    fn create_job(
        &self,
        project_id: ProjectId,
        runner: String,
        command: Vec<String>,
        working_dir: String,
        env: std::collections::HashMap<String, String>,
    ) -> Result<Response, DaemonError> {
        let spec = JobSpec {
            project_id,
            runner,
            command,
            working_dir,
            env: env.into_iter().collect(),
            stdin: None,
        };
        let entry = self.jobs.submit(spec)?;
        Ok(Response::Job { job: JobSummary::from(&entry.snapshot()) })
    }

    fn list_jobs(&self, project_id: ProjectId) -> Result<Response, DaemonError> {
        let jobs = self
            .jobs
            .list()
            .into_iter()
            .filter(|j| j.project_id == project_id)
            .map(|j| JobSummary::from(&j))
            .collect();
        Ok(Response::Jobs { jobs })
    }

    fn get_job(&self, project_id: ProjectId, job_id: hack_core::JobId) -> Result<Response, DaemonError> {
        let entry = self
            .jobs
            .get(&job_id)
            .ok_or_else(|| hack_supervisor::SupervisorError::JobNotFound(job_id.to_string()))?;
        let job = entry.snapshot();
        if job.project_id != project_id {
            return Err(hack_supervisor::SupervisorError::JobNotFound(job_id.to_string()).into());
        }
        Ok(Response::Job { job: JobSummary::from(&job) })
    }

    fn cancel_job(&self, project_id: ProjectId, job_id: hack_core::JobId) -> Result<Response, DaemonError> {
        let entry = self
            .jobs
            .get(&job_id)
            .ok_or_else(|| hack_supervisor::SupervisorError::JobNotFound(job_id.to_string()))?;
        if entry.snapshot().project_id != project_id {
            return Err(hack_supervisor::SupervisorError::JobNotFound(job_id.to_string()).into());
        }
        self.jobs.cancel(&job_id)?;
        Ok(Response::JobCancelRequested { job_id })
    }

    fn create_shell(
        &self,
        project_id: ProjectId,
        cols: u16,
        rows: u16,
        working_dir: Option<String>,
    ) -> Result<Response, DaemonError> {
        let working_dir = working_dir.unwrap_or_else(|| ".".to_string());
        let shell_program = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());
        let entry = self.shells.spawn(project_id, cols, rows, working_dir, shell_program)?;
        Ok(Response::Shell { shell: ShellSummary::from(&entry.snapshot()) })
    }

    fn get_shell(&self, project_id: ProjectId, shell_id: hack_core::ShellId) -> Result<Response, DaemonError> {
        let entry = self
            .shells
            .get(&shell_id)
            .ok_or_else(|| hack_supervisor::SupervisorError::ShellNotFound(shell_id.to_string()))?;
        let shell = entry.snapshot();
        if shell.project_id != project_id {
            return Err(hack_supervisor::SupervisorError::ShellNotFound(shell_id.to_string()).into());
        }
        Ok(Response::Shell { shell: ShellSummary::from(&shell) })
    }
}

/// RAII guard decrementing `active_streams` when a job/shell stream detaches.
pub struct StreamGuard<'a> {
    router: &'a Router,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.router.active_streams.fetch_sub(1, Ordering::Relaxed);
    }
}
