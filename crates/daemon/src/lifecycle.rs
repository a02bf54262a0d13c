// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Daemon startup, status, and shutdown (spec §4.1, §4.5).
//!
//! The PID file doubles as the advisory lock: acquiring it first makes
//! "is a daemon already running" and "am I allowed to start" the same
//! check, so two `hackd start` invocations can never both win.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal;
use nix::unistd::Pid;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use hack_config::paths::Paths;
use hack_config::lock::{FileLock, LockError};
use hack_registry::RegistryStore;
use hack_runtime::RuntimeCache;
use hack_supervisor::{JobSupervisor, ShellSupervisor};

use crate::router::Router;

/// Grace period between SIGTERM and SIGKILL during shutdown (spec §4.1).
/// Deliberately shorter than `hack_supervisor::jobs`'s own 5s per-job
/// `TERM_GRACE` — shutdown has a tighter budget than an individual cancel.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const LOCK_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("daemon already running (pid {0})")]
    AlreadyRunning(i32),
    #[error("failed to acquire pid lock: {0}")]
    LockFailed(#[from] LockError),
    #[error("failed to bind socket at {path}: {source}")]
    BindFailed { path: PathBuf, source: std::io::Error },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleReason {
    /// A pid file (or lock) exists but no process holds it.
    PidNotRunning,
    /// The socket exists but nothing answers on it and no pid file does either.
    SocketOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum DaemonStatus {
    Stopped,
    Starting,
    Running { pid: i32 },
    Stale { reason: StaleReason },
}

/// Inspect pid/socket files on disk without starting anything. Used by
/// `hack daemon status` and by `start` to decide whether to bail out.
pub fn status(paths: &Paths) -> DaemonStatus {
    let pid_path = paths.daemon_pid();
    let socket_path = paths.daemon_socket();

    match read_pid(&pid_path) {
        Some(pid) if process_is_alive(pid) => DaemonStatus::Running { pid },
        Some(_) => DaemonStatus::Stale { reason: StaleReason::PidNotRunning },
        None if socket_path.exists() => DaemonStatus::Stale { reason: StaleReason::SocketOnly },
        None => DaemonStatus::Stopped,
    }
}

fn read_pid(pid_path: &std::path::Path) -> Option<i32> {
    fs::read_to_string(pid_path).ok()?.trim().parse().ok()
}

fn process_is_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None).is_ok()
}

/// Remove stale pid/socket files left by a daemon that died without
/// cleaning up after itself (spec §4.1 `stale` status).
pub fn clear(paths: &Paths) -> Result<(), LifecycleError> {
    for path in [paths.daemon_pid(), paths.daemon_socket()] {
        if path.exists() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// A running daemon's held resources: the pid lock (released on drop),
/// the shared domain state, and the paths it owns.
pub struct DaemonState {
    pub paths: Paths,
    pub router: Arc<Router>,
    lock: FileLock,
}

pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

/// Acquire the pid lock, bind the Unix socket, and construct the shared
/// `Router` the socket listener and HTTP gateway both dispatch through.
pub async fn startup(
    paths: Paths,
    registry: Arc<RegistryStore>,
    runtime: Arc<RuntimeCache>,
    clock: Arc<dyn hack_core::Clock>,
) -> Result<StartupResult, LifecycleError> {
    fs::create_dir_all(paths.daemon_dir())?;

    let lock = FileLock::acquire(&paths.daemon_pid(), LOCK_DEADLINE).map_err(|e| {
        if let Some(pid) = read_pid(&paths.daemon_pid()) {
            if process_is_alive(pid) {
                return LifecycleError::AlreadyRunning(pid);
            }
        }
        LifecycleError::LockFailed(e)
    })?;

    let mut pid_file = OpenOptions::new().write(true).truncate(true).open(paths.daemon_pid())?;
    writeln!(pid_file, "{}", std::process::id())?;
    drop(pid_file);

    if paths.daemon_socket().exists() {
        fs::remove_file(paths.daemon_socket())?;
    }
    let listener = UnixListener::bind(paths.daemon_socket())
        .map_err(|source| LifecycleError::BindFailed { path: paths.daemon_socket(), source })?;

    let jobs = JobSupervisor::new(Arc::clone(&clock));
    let shells = ShellSupervisor::new(Arc::clone(&clock));
    let router = Arc::new(Router::new(registry, runtime, jobs, shells, clock));

    Ok(StartupResult { daemon: DaemonState { paths, router, lock }, listener })
}

impl DaemonState {
    /// Graceful shutdown (spec §4.1): stop taking new work, end every
    /// in-flight job/shell with a SIGTERM-then-SIGKILL sweep bounded by
    /// `SHUTDOWN_GRACE`, then remove the pid and socket files. The advisory
    /// lock itself is released when `self.lock` drops.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("shutting down hackd");

        let job_ids: Vec<_> = self.router.jobs.list().into_iter().map(|j| j.id).collect();
        for id in &job_ids {
            let _ = self.router.jobs.cancel(id);
        }
        let shell_ids: Vec<_> = self.router.shells.list().into_iter().map(|s| s.id).collect();
        for id in &shell_ids {
            if let Some(entry) = self.router.shells.get(id) {
                let _ = entry.send_input(vec![0x1c]);
            }
        }

        let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
        while tokio::time::Instant::now() < deadline {
            let all_terminal = job_ids
                .iter()
                .filter_map(|id| self.router.jobs.get(id))
                .all(|entry| entry.snapshot().status.is_terminal());
            if all_terminal {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        for id in &shell_ids {
            let _ = self.router.shells.close(id);
        }

        if self.paths.daemon_socket().exists() {
            if let Err(e) = fs::remove_file(self.paths.daemon_socket()) {
                warn!("failed to remove socket file: {}", e);
            }
        }
        if self.paths.daemon_pid().exists() {
            if let Err(e) = fs::remove_file(self.paths.daemon_pid()) {
                warn!("failed to remove pid file: {}", e);
            }
        }
        drop(self.lock);
        info!("hackd shutdown complete");
        Ok(())
    }
}
