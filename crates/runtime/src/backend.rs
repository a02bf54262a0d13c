// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! `RuntimeBackend`: the seam between the control plane and the container
//! runtime CLI. One production implementation shells out to `docker`
//! (treated as an opaque child process, never linked against); an in-memory
//! fake drives the cache's unit tests without a real runtime present.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use hack_core::{ContainerStatus, RuntimeFingerprint, RuntimeLabels, RuntimeProject};

use crate::error::RuntimeError;

const RUNTIME_CLI_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait RuntimeBackend: Send + Sync + 'static {
    async fn inventory(&self) -> Result<Vec<RuntimeProject>, RuntimeError>;
    async fn identity(&self) -> Result<RuntimeFingerprint, RuntimeError>;
}

async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<std::process::Output, RuntimeError> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(RuntimeError::Unreachable(format!("{label}: {e}"))),
        Err(_) => Err(RuntimeError::Timeout(timeout)),
    }
}

/// Shells out to the `docker` CLI. Never links `bollard` or any Docker SDK —
/// the daemon treats the runtime exactly like any other opaque child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliRuntimeBackend;

impl CliRuntimeBackend {
    pub fn new() -> Self {
        Self
    }

    fn compose_label(container: &serde_json::Value, key: &str) -> Option<String> {
        let labels_str = container.get("Labels")?.as_str()?;
        labels_str.split(',').find_map(|kv| {
            let (k, v) = kv.split_once('=')?;
            (k == key).then(|| v.to_string())
        })
    }
}

#[async_trait]
impl RuntimeBackend for CliRuntimeBackend {
    async fn inventory(&self) -> Result<Vec<RuntimeProject>, RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(["ps", "--all", "--format", "{{json .}}"]);
        let output = run_with_timeout(cmd, RUNTIME_CLI_TIMEOUT, "docker ps").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RuntimeError::CommandFailed(stderr));
        }

        let mut projects: BTreeMap<String, RuntimeProject> = BTreeMap::new();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            if line.trim().is_empty() {
                continue;
            }
            let container: serde_json::Value = serde_json::from_str(line)
                .map_err(|e| RuntimeError::Unparsable(e.to_string()))?;
            let Some(compose_project) = Self::compose_label(&container, "com.docker.compose.project")
            else {
                continue;
            };
            let service = Self::compose_label(&container, "com.docker.compose.service")
                .unwrap_or_else(|| "default".to_string());
            let working_dir =
                Self::compose_label(&container, "com.docker.compose.project.working_dir")
                    .map(std::path::PathBuf::from);

            let name = container.get("Names").and_then(|v| v.as_str()).unwrap_or("").to_string();
            let status = container.get("State").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
            let ports = container
                .get("Ports")
                .and_then(|v| v.as_str())
                .map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
                .unwrap_or_default();

            let labels = RuntimeLabels {
                project_name: Self::compose_label(&container, "com.hack.project"),
                dev_host: Self::compose_label(&container, "com.hack.dev_host"),
                repo_root: Self::compose_label(&container, "com.hack.repo_root").map(std::path::PathBuf::from),
                config_dir: Self::compose_label(&container, "com.hack.config_dir").map(std::path::PathBuf::from),
            };

            let entry = projects.entry(compose_project.clone()).or_insert_with(|| RuntimeProject {
                compose_project: compose_project.clone(),
                working_dir: working_dir.clone(),
                services: BTreeMap::new(),
                labels: labels.clone(),
            });
            if entry.working_dir.is_none() {
                entry.working_dir = working_dir;
            }
            entry.services.entry(service).or_default().push(ContainerStatus { name, status, ports });
        }
        Ok(projects.into_values().collect())
    }

    async fn identity(&self) -> Result<RuntimeFingerprint, RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(["info", "--format", "{{json .}}"]);
        let output = run_with_timeout(cmd, RUNTIME_CLI_TIMEOUT, "docker info").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RuntimeError::CommandFailed(stderr));
        }
        let info: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| RuntimeError::Unparsable(e.to_string()))?;

        let socket_path =
            std::env::var("DOCKER_HOST").unwrap_or_else(|_| "unix:///var/run/docker.sock".to_string());
        let socket_inode = socket_inode(&socket_path);
        let engine_id = info.get("ID").and_then(|v| v.as_str()).map(str::to_string);
        let runtime_host = info
            .get("Name")
            .and_then(|v| v.as_str())
            .unwrap_or(&socket_path)
            .to_string();

        Ok(RuntimeFingerprint { runtime_host, socket_path, socket_inode, engine_id })
    }
}

#[cfg(unix)]
fn socket_inode(socket_path: &str) -> u64 {
    use std::os::unix::fs::MetadataExt;
    let path = socket_path.trim_start_matches("unix://");
    std::fs::metadata(path).map(|m| m.ino()).unwrap_or(0)
}

#[cfg(not(unix))]
fn socket_inode(_socket_path: &str) -> u64 {
    0
}

/// In-memory backend for tests: returns whatever the test harness configured,
/// with no process spawned.
#[derive(Default)]
pub struct FakeRuntimeBackend {
    state: parking_lot::Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    inventory: Vec<RuntimeProject>,
    identity: Option<RuntimeFingerprint>,
    next_inventory_error: Option<String>,
    next_identity_error: Option<String>,
}

impl FakeRuntimeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_inventory(&self, projects: Vec<RuntimeProject>) {
        self.state.lock().inventory = projects;
    }

    pub fn set_identity(&self, fingerprint: RuntimeFingerprint) {
        self.state.lock().identity = Some(fingerprint);
    }

    pub fn fail_next_inventory(&self, message: impl Into<String>) {
        self.state.lock().next_inventory_error = Some(message.into());
    }
}

#[async_trait]
impl RuntimeBackend for FakeRuntimeBackend {
    async fn inventory(&self) -> Result<Vec<RuntimeProject>, RuntimeError> {
        let mut state = self.state.lock();
        if let Some(message) = state.next_inventory_error.take() {
            return Err(RuntimeError::Unreachable(message));
        }
        Ok(state.inventory.clone())
    }

    async fn identity(&self) -> Result<RuntimeFingerprint, RuntimeError> {
        let mut state = self.state.lock();
        if let Some(message) = state.next_identity_error.take() {
            return Err(RuntimeError::Unreachable(message));
        }
        Ok(state.identity.clone().unwrap_or(RuntimeFingerprint {
            runtime_host: "fake".to_string(),
            socket_path: "fake".to_string(),
            socket_inode: 0,
            engine_id: Some("fake-engine".to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_backend_returns_configured_inventory() {
        let backend = FakeRuntimeBackend::new();
        backend.set_inventory(vec![RuntimeProject {
            compose_project: "widgets".into(),
            working_dir: None,
            services: BTreeMap::new(),
            labels: RuntimeLabels::default(),
        }]);
        let inventory = backend.inventory().await.expect("inventory");
        assert_eq!(inventory.len(), 1);
    }

    #[tokio::test]
    async fn fake_backend_surfaces_a_configured_failure_once() {
        let backend = FakeRuntimeBackend::new();
        backend.fail_next_inventory("docker daemon not running");
        assert!(backend.inventory().await.is_err());
        assert!(backend.inventory().await.is_ok());
    }
}
