// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Bounded worker pool executing queued jobs (spec §4.3).
//!
//! Jobs are FIFO-queued onto a bounded channel and picked up by one of a
//! fixed number of worker tasks. Each worker owns the child process end to
//! end: spawn, stream stdout/stderr into the job's `JobBus`, watch for a
//! cancellation request, and record the terminal event.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};

use hack_core::{Clock, Job, JobId, JobStatus, ProjectId};

use crate::bus::{JobBus, JobEventKind};
use crate::error::SupervisorError;

const DEFAULT_WORKER_COUNT: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const TERM_GRACE: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 8 * 1024;

pub struct JobSpec {
    pub project_id: ProjectId,
    pub runner: String,
    pub command: Vec<String>,
    pub working_dir: String,
    pub env: Vec<(String, String)>,
    pub stdin: Option<Vec<u8>>,
}

pub struct JobEntry {
    pub job: RwLock<Job>,
    pub bus: Arc<JobBus>,
    cancel_tx: watch::Sender<bool>,
}

impl JobEntry {
    pub fn snapshot(&self) -> Job {
        self.job.read().clone()
    }
}

pub struct JobSupervisor {
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    specs: RwLock<HashMap<JobId, JobSpec>>,
    tx: mpsc::Sender<JobId>,
    clock: Arc<dyn Clock>,
}

impl JobSupervisor {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Self::with_worker_count(clock, DEFAULT_WORKER_COUNT)
    }

    pub fn with_worker_count(clock: Arc<dyn Clock>, worker_count: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
        let supervisor =
            Arc::new(Self { jobs: RwLock::new(HashMap::new()), specs: RwLock::new(HashMap::new()), tx, clock });
        let rx = Arc::new(AsyncMutex::new(rx));
        for worker in 0..worker_count.max(1) {
            let supervisor = Arc::clone(&supervisor);
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let next = { rx.lock().await.recv().await };
                    let Some(job_id) = next else { break };
                    tracing::debug!(worker, %job_id, "picked up queued job");
                    supervisor.run_job(job_id).await;
                }
            });
        }
        supervisor
    }

    pub fn submit(&self, spec: JobSpec) -> Result<Arc<JobEntry>, SupervisorError> {
        let now = self.clock.now_ms();
        let job = Job::new(
            spec.project_id.clone(),
            &spec.runner,
            spec.command.clone(),
            &spec.working_dir,
            spec.env.clone(),
            now,
        );
        let job_id = job.id.clone();
        let bus = Arc::new(JobBus::new(crate::log_ring::DEFAULT_CAPACITY));
        bus.publish_event(JobEventKind::Created, now);
        let (cancel_tx, _) = watch::channel(false);
        let entry = Arc::new(JobEntry { job: RwLock::new(job), bus, cancel_tx });

        self.jobs.write().insert(job_id.clone(), Arc::clone(&entry));
        self.specs.write().insert(job_id.clone(), spec);
        self.tx.try_send(job_id).map_err(|_| SupervisorError::SpawnFailed("job queue is full".into()))?;
        Ok(entry)
    }

    pub fn get(&self, id: &JobId) -> Option<Arc<JobEntry>> {
        self.jobs.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Job> {
        self.jobs.read().values().map(|e| e.snapshot()).collect()
    }

    pub fn cancel(&self, id: &JobId) -> Result<(), SupervisorError> {
        let entry = self.get(id).ok_or_else(|| SupervisorError::JobNotFound(id.to_string()))?;
        {
            let job = entry.job.read();
            if job.status.is_terminal() {
                return Ok(());
            }
            if job.status == JobStatus::Queued {
                let mut job = entry.job.write();
                if job.status == JobStatus::Queued {
                    job.status = JobStatus::Canceled;
                    job.ended_at_ms = Some(self.clock.now_ms());
                    entry.bus.publish_event(JobEventKind::Canceled, self.clock.now_ms());
                    return Ok(());
                }
            }
        }
        let _ = entry.cancel_tx.send(true);
        Ok(())
    }

    async fn run_job(self: &Arc<Self>, job_id: JobId) {
        let Some(entry) = self.get(&job_id) else { return };
        {
            let job = entry.job.read();
            if job.status != JobStatus::Queued {
                return;
            }
        }
        let Some(spec) = self.specs.write().remove(&job_id) else { return };

        let started_at = self.clock.now_ms();
        {
            let mut job = entry.job.write();
            job.status = JobStatus::Running;
            job.started_at_ms = Some(started_at);
        }
        entry.bus.publish_event(JobEventKind::Started, started_at);

        let mut command = Command::new(&spec.runner);
        command
            .args(&spec.command)
            .current_dir(&spec.working_dir)
            .envs(spec.env.iter().cloned())
            .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let (status, exit_code) = match command.spawn() {
            Ok(mut child) => {
                if let (Some(input), Some(mut stdin)) = (spec.stdin, child.stdin.take()) {
                    let _ = stdin.write_all(&input).await;
                }
                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                let bus = Arc::clone(&entry.bus);
                let clock = Arc::clone(&self.clock);
                let stdout_task = tokio::spawn(pump(stdout, bus, JobEventKind::Stdout, clock));
                let bus = Arc::clone(&entry.bus);
                let clock = Arc::clone(&self.clock);
                let stderr_task = tokio::spawn(pump(stderr, bus, JobEventKind::Stderr, clock));

                let mut cancel_rx = entry.cancel_tx.subscribe();
                let wait_result = loop {
                    tokio::select! {
                        status = child.wait() => break status,
                        changed = cancel_rx.changed() => {
                            if changed.is_ok() && *cancel_rx.borrow() {
                                if let Some(pid) = child.id() {
                                    let _ = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
                                }
                                match tokio::time::timeout(TERM_GRACE, child.wait()).await {
                                    Ok(status) => break status,
                                    Err(_) => {
                                        let _ = child.start_kill();
                                        break child.wait().await;
                                    }
                                }
                            }
                        }
                    }
                };
                let _ = stdout_task.await;
                let _ = stderr_task.await;

                let canceled = *entry.cancel_tx.borrow();
                match wait_result {
                    Ok(status) if canceled => (JobStatus::Canceled, status.code()),
                    Ok(status) if status.success() => (JobStatus::Completed, status.code()),
                    Ok(status) => (JobStatus::Failed, status.code()),
                    Err(err) => {
                        tracing::warn!(error = %err, "failed waiting on child process");
                        (JobStatus::Failed, None)
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, runner = %spec.runner, "failed to spawn job");
                entry.bus.publish_log(format!("spawn failed: {err}\n").as_bytes());
                (JobStatus::Failed, None)
            }
        };

        let ended_at = self.clock.now_ms();
        {
            let mut job = entry.job.write();
            job.status = status;
            job.ended_at_ms = Some(ended_at);
            job.exit_code = exit_code;
            job.logs_offset = entry.bus.logs_offset();
        }
        let kind = match status {
            JobStatus::Completed => JobEventKind::Completed,
            JobStatus::Canceled => JobEventKind::Canceled,
            _ => JobEventKind::Failed,
        };
        entry.bus.publish_event(kind, ended_at);
        {
            let mut job = entry.job.write();
            job.events_seq = entry.bus.events_seq();
        }
    }
}

async fn pump(
    pipe: Option<impl tokio::io::AsyncRead + Unpin>,
    bus: Arc<JobBus>,
    kind: JobEventKind,
    clock: Arc<dyn Clock>,
) {
    let Some(mut pipe) = pipe else { return };
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                bus.publish_log(&buf[..n]);
                bus.publish_event(kind, clock.now_ms());
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hack_core::FakeClock;
    use tokio::time::{sleep, timeout};

    fn spec(runner: &str, args: &[&str]) -> JobSpec {
        JobSpec {
            project_id: ProjectId::new(),
            runner: runner.into(),
            command: args.iter().map(|s| s.to_string()).collect(),
            working_dir: "/tmp".into(),
            env: Vec::new(),
            stdin: None,
        }
    }

    async fn wait_terminal(supervisor: &Arc<JobSupervisor>, id: &JobId) -> Job {
        timeout(Duration::from_secs(5), async {
            loop {
                let job = supervisor.get(id).expect("job should exist").snapshot();
                if job.status.is_terminal() {
                    return job;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job should reach a terminal status within the timeout")
    }

    #[tokio::test]
    async fn a_successful_command_completes_and_streams_stdout() {
        let supervisor = JobSupervisor::with_worker_count(Arc::new(FakeClock::new(0)), 2);
        let entry = supervisor.submit(spec("/bin/echo", &["hello"])).expect("submit should succeed");
        let job = wait_terminal(&supervisor, &entry.snapshot().id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.exit_code, Some(0));
        let logs = entry.bus.subscribe(0, 0).0;
        let has_hello = logs.iter().any(|u| matches!(u, crate::bus::JobUpdate::Log { data, .. } if data.windows(5).any(|w| w == b"hello")));
        assert!(has_hello);
    }

    #[tokio::test]
    async fn a_failing_command_is_recorded_as_failed_with_its_exit_code() {
        let supervisor = JobSupervisor::with_worker_count(Arc::new(FakeClock::new(0)), 2);
        let entry = supervisor.submit(spec("/bin/false", &[])).expect("submit should succeed");
        let job = wait_terminal(&supervisor, &entry.snapshot().id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.exit_code, Some(1));
    }

    #[tokio::test]
    async fn cancel_sends_sigterm_and_the_job_ends_canceled() {
        let supervisor = JobSupervisor::with_worker_count(Arc::new(FakeClock::new(0)), 2);
        let entry = supervisor.submit(spec("/bin/sleep", &["30"])).expect("submit should succeed");
        let id = entry.snapshot().id;
        sleep(Duration::from_millis(50)).await;
        supervisor.cancel(&id).expect("cancel should succeed on a running job");
        let job = wait_terminal(&supervisor, &id).await;
        assert_eq!(job.status, JobStatus::Canceled);
    }

    #[tokio::test]
    async fn canceling_a_still_queued_job_skips_straight_to_canceled() {
        let supervisor = JobSupervisor::with_worker_count(Arc::new(FakeClock::new(0)), 1);
        // Saturate the single worker with a slow job so the next one stays queued.
        let _busy = supervisor.submit(spec("/bin/sleep", &["1"])).expect("submit should succeed");
        let entry = supervisor.submit(spec("/bin/echo", &["queued"])).expect("submit should succeed");
        let id = entry.snapshot().id;
        supervisor.cancel(&id).expect("cancel should succeed on a queued job");
        let job = supervisor.get(&id).expect("job should exist").snapshot();
        assert_eq!(job.status, JobStatus::Canceled);
    }

    #[tokio::test]
    async fn unknown_runner_spawns_fail_the_job_without_panicking() {
        let supervisor = JobSupervisor::with_worker_count(Arc::new(FakeClock::new(0)), 2);
        let entry = supervisor
            .submit(spec("/definitely/not/a/real/binary", &[]))
            .expect("submit should succeed even though the spawn will fail");
        let job = wait_terminal(&supervisor, &entry.snapshot().id).await;
        assert_eq!(job.status, JobStatus::Failed);
    }
}
