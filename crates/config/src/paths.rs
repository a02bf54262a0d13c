// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Persisted state layout under `$HOME/.hack/` (spec §6).

use std::path::PathBuf;

use hack_core::{ErrorKind, HackError};

/// Resolved locations for every file the daemon and gateway own.
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Resolve the state root: `HACK_GLOBAL_CONFIG_PATH`'s parent directory
    /// if set, otherwise `$HOME/.hack`.
    pub fn resolve() -> Result<Self, HackError> {
        if let Ok(global_config) = std::env::var("HACK_GLOBAL_CONFIG_PATH") {
            let path = PathBuf::from(global_config);
            let root = path.parent().map(|p| p.to_path_buf()).unwrap_or(path);
            return Ok(Self { root });
        }
        let home = dirs::home_dir()
            .ok_or_else(|| HackError::new(ErrorKind::Fatal, "cannot resolve $HOME"))?;
        Ok(Self { root: home.join(".hack") })
    }

    pub fn for_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn global_config(&self) -> PathBuf {
        self.root.join("hack.config.json")
    }

    pub fn projects_registry(&self) -> PathBuf {
        self.root.join("projects.json")
    }

    pub fn registry_lock(&self) -> PathBuf {
        self.root.join("projects.json.lock")
    }

    pub fn daemon_dir(&self) -> PathBuf {
        self.root.join("daemon")
    }

    pub fn daemon_socket(&self) -> PathBuf {
        self.daemon_dir().join("hackd.sock")
    }

    pub fn daemon_pid(&self) -> PathBuf {
        self.daemon_dir().join("hackd.pid")
    }

    pub fn daemon_log(&self) -> PathBuf {
        self.daemon_dir().join("hackd.log")
    }

    pub fn daemon_stdout_log(&self) -> PathBuf {
        self.daemon_dir().join("hackd.stdout.log")
    }

    pub fn daemon_stderr_log(&self) -> PathBuf {
        self.daemon_dir().join("hackd.stderr.log")
    }

    pub fn gateway_dir(&self) -> PathBuf {
        self.daemon_dir().join("gateway")
    }

    pub fn gateway_tokens(&self) -> PathBuf {
        self.gateway_dir().join("tokens.json")
    }

    pub fn gateway_tokens_lock(&self) -> PathBuf {
        self.gateway_dir().join("tokens.json.lock")
    }

    pub fn gateway_audit_log(&self) -> PathBuf {
        self.gateway_dir().join("audit.jsonl")
    }
}

/// Per-project state under `<repo>/.hack/`.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self { root: repo_root.into().join(".hack") }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("hack.config.json")
    }

    pub fn compose_file(&self) -> PathBuf {
        self.root.join("docker-compose.yml")
    }

    pub fn branches_file(&self) -> PathBuf {
        self.root.join("hack.branches.json")
    }

    pub fn tickets_dir(&self) -> PathBuf {
        self.root.join("tickets")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_paths_are_scoped_under_dot_hack() {
        let paths = ProjectPaths::new("/repo");
        assert_eq!(paths.root(), std::path::Path::new("/repo/.hack"));
        assert_eq!(paths.config(), PathBuf::from("/repo/.hack/hack.config.json"));
        assert_eq!(paths.tickets_dir(), PathBuf::from("/repo/.hack/tickets"));
    }

    #[test]
    fn global_paths_are_scoped_under_daemon_dir() {
        let paths = Paths::for_root(PathBuf::from("/home/u/.hack"));
        assert_eq!(paths.daemon_socket(), PathBuf::from("/home/u/.hack/daemon/hackd.sock"));
        assert_eq!(paths.gateway_tokens(), PathBuf::from("/home/u/.hack/daemon/gateway/tokens.json"));
    }
}
