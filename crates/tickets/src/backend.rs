// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! `GitRefBackend`: the seam between the tickets channel and version
//! control. One production implementation shells out to `git` plumbing
//! (treated as an opaque child process, the same idiom `hack_runtime`
//! applies to `docker`); an in-memory fake drives the channel's unit tests.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::TicketsError;

const GIT_CLI_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait GitRefBackend: Send + Sync + 'static {
    /// Refresh knowledge of `ref_name` against the remote (a no-op for a
    /// purely local backend) and return its current commit id, if any.
    async fn fetch_ref(&self, ref_name: &str) -> Result<Option<String>, TicketsError>;

    /// The full set of files recorded at `ref_name`'s tip, keyed by path
    /// relative to the tree root. Empty if the ref doesn't exist yet.
    async fn read_tree(&self, ref_name: &str) -> Result<BTreeMap<String, Vec<u8>>, TicketsError>;

    /// Build (but don't publish) a commit whose tree is exactly `files`.
    async fn commit_tree(
        &self,
        parent: Option<&str>,
        files: &BTreeMap<String, Vec<u8>>,
        message: &str,
    ) -> Result<String, TicketsError>;

    /// Publish `commit` as the new tip of `ref_name`, but only if the ref's
    /// current value still matches `expected_base` (compare-and-swap).
    async fn push_ref(&self, ref_name: &str, commit: &str, expected_base: Option<&str>) -> Result<(), TicketsError>;
}

/// Shells out to `git` plumbing against a bare repository. The channel
/// never needs an actual checked-out working tree: every read/write goes
/// through `hash-object`/`update-index`/`write-tree`/`commit-tree`, so there
/// is nothing here for a concurrent `git status` to race against.
pub struct CliGitRefBackend {
    repo_dir: PathBuf,
    hidden_refs_supported: bool,
}

impl CliGitRefBackend {
    /// `repo_dir` must already be an initialized bare repository.
    pub fn new(repo_dir: PathBuf, hidden_refs_supported: bool) -> Self {
        Self { repo_dir, hidden_refs_supported }
    }

    pub async fn init_bare(repo_dir: &PathBuf) -> Result<(), TicketsError> {
        tokio::fs::create_dir_all(repo_dir).await.map_err(TicketsError::Io)?;
        let mut cmd = Command::new("git");
        cmd.arg("init").arg("--bare").arg("-q").arg(repo_dir);
        run(cmd, None).await?;
        Ok(())
    }

    fn is_hidden(&self, ref_name: &str) -> bool {
        !ref_name.starts_with("refs/heads/")
    }

    async fn run_git(&self, args: &[&str], extra_env: &[(&str, &str)], stdin: Option<&[u8]>) -> Result<Vec<u8>, TicketsError> {
        let mut cmd = Command::new("git");
        cmd.arg(format!("--git-dir={}", self.repo_dir.display()));
        cmd.args(args);
        for (k, v) in extra_env {
            cmd.env(k, v);
        }
        run(cmd, stdin).await
    }

    async fn resolve(&self, ref_name: &str) -> Result<Option<String>, TicketsError> {
        let mut cmd = Command::new("git");
        cmd.arg(format!("--git-dir={}", self.repo_dir.display()));
        cmd.args(["rev-parse", "--verify", "-q", ref_name]);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        match tokio::time::timeout(GIT_CLI_TIMEOUT, cmd.output()).await {
            Ok(Ok(out)) if out.status.success() => {
                let oid = String::from_utf8_lossy(&out.stdout).trim().to_string();
                Ok(Some(oid))
            }
            Ok(Ok(_)) => Ok(None),
            Ok(Err(e)) => Err(TicketsError::CommandFailed(e.to_string())),
            Err(_) => Err(TicketsError::CommandFailed("git rev-parse timed out".into())),
        }
    }
}

#[async_trait]
impl GitRefBackend for CliGitRefBackend {
    async fn fetch_ref(&self, ref_name: &str) -> Result<Option<String>, TicketsError> {
        // Purely local bare repo: "fetching" is just re-resolving the ref,
        // since there is no separate remote to sync from in this workspace.
        self.resolve(ref_name).await
    }

    async fn read_tree(&self, ref_name: &str) -> Result<BTreeMap<String, Vec<u8>>, TicketsError> {
        if self.resolve(ref_name).await?.is_none() {
            return Ok(BTreeMap::new());
        }
        let listing = self.run_git(&["ls-tree", "-r", "--name-only", ref_name], &[], None).await?;
        let mut files = BTreeMap::new();
        for path in String::from_utf8_lossy(&listing).lines() {
            if path.is_empty() {
                continue;
            }
            let blob = self.run_git(&["cat-file", "-p", &format!("{ref_name}:{path}")], &[], None).await?;
            files.insert(path.to_string(), blob);
        }
        Ok(files)
    }

    async fn commit_tree(
        &self,
        parent: Option<&str>,
        files: &BTreeMap<String, Vec<u8>>,
        message: &str,
    ) -> Result<String, TicketsError> {
        let index_path = self.repo_dir.join(format!("tickets-index-{}", uuid::Uuid::new_v4()));
        let index_env = index_path.display().to_string();

        let mut index_info = String::new();
        for (path, contents) in files {
            let blob = self.run_git(&["hash-object", "-w", "--stdin"], &[], Some(contents.as_slice())).await?;
            let sha = String::from_utf8_lossy(&blob).trim().to_string();
            index_info.push_str(&format!("100644 {sha}\t{path}\n"));
        }

        self.run_git(
            &["update-index", "--index-info"],
            &[("GIT_INDEX_FILE", index_env.as_str())],
            Some(index_info.as_bytes()),
        )
        .await?;
        let tree = self.run_git(&["write-tree"], &[("GIT_INDEX_FILE", index_env.as_str())], None).await?;
        let tree_oid = String::from_utf8_lossy(&tree).trim().to_string();

        let _ = tokio::fs::remove_file(&index_path).await;

        let mut commit_args = vec!["commit-tree".to_string(), tree_oid];
        if let Some(parent) = parent {
            commit_args.push("-p".into());
            commit_args.push(parent.into());
        }
        commit_args.push("-m".into());
        commit_args.push(message.into());
        let env = [
            ("GIT_AUTHOR_NAME", "hack"),
            ("GIT_AUTHOR_EMAIL", "hack@localhost"),
            ("GIT_COMMITTER_NAME", "hack"),
            ("GIT_COMMITTER_EMAIL", "hack@localhost"),
        ];
        let args: Vec<&str> = commit_args.iter().map(String::as_str).collect();
        let commit = self.run_git(&args, &env, None).await?;
        Ok(String::from_utf8_lossy(&commit).trim().to_string())
    }

    async fn push_ref(&self, ref_name: &str, commit: &str, expected_base: Option<&str>) -> Result<(), TicketsError> {
        if self.is_hidden(ref_name) && !self.hidden_refs_supported {
            return Err(TicketsError::HiddenRefRejected(ref_name.to_string()));
        }
        let mut args = vec!["update-ref".to_string(), ref_name.to_string(), commit.to_string()];
        if let Some(base) = expected_base {
            args.push(base.to_string());
        }
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match self.run_git(&args, &[], None).await {
            Ok(_) => Ok(()),
            Err(TicketsError::CommandFailed(msg)) => Err(TicketsError::NonFastForward(msg)),
            Err(other) => Err(other),
        }
    }
}

async fn run(mut cmd: Command, stdin: Option<&[u8]>) -> Result<Vec<u8>, TicketsError> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });

    let mut child = cmd.spawn().map_err(|e| TicketsError::CommandFailed(e.to_string()))?;
    if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(data).await.map_err(TicketsError::Io)?;
        drop(pipe);
    }
    let output = match tokio::time::timeout(GIT_CLI_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(TicketsError::CommandFailed(e.to_string())),
        Err(_) => return Err(TicketsError::CommandFailed("git command timed out".into())),
    };
    if !output.status.success() {
        return Err(TicketsError::CommandFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(output.stdout)
}

/// In-memory double: one `(ref -> (commit id, tree))` map per instance,
/// guarded by a `parking_lot::Mutex` since tests drive it from sync code.
#[derive(Default)]
pub struct FakeGitRefBackend {
    refs: Mutex<BTreeMap<String, (String, BTreeMap<String, Vec<u8>>)>>,
    hidden_refs_supported: bool,
    next_commit: Mutex<u64>,
}

impl FakeGitRefBackend {
    pub fn new(hidden_refs_supported: bool) -> Self {
        Self { refs: Mutex::new(BTreeMap::new()), hidden_refs_supported, next_commit: Mutex::new(0) }
    }

    fn mint_commit_id(&self) -> String {
        let mut next = self.next_commit.lock();
        *next += 1;
        format!("fake-commit-{next}")
    }
}

#[async_trait]
impl GitRefBackend for FakeGitRefBackend {
    async fn fetch_ref(&self, ref_name: &str) -> Result<Option<String>, TicketsError> {
        Ok(self.refs.lock().get(ref_name).map(|(oid, _)| oid.clone()))
    }

    async fn read_tree(&self, ref_name: &str) -> Result<BTreeMap<String, Vec<u8>>, TicketsError> {
        Ok(self.refs.lock().get(ref_name).map(|(_, tree)| tree.clone()).unwrap_or_default())
    }

    async fn commit_tree(
        &self,
        _parent: Option<&str>,
        files: &BTreeMap<String, Vec<u8>>,
        _message: &str,
    ) -> Result<String, TicketsError> {
        // The fake stages the commit under a synthetic id; `push_ref` is what
        // actually publishes it against a ref, mirroring the CLI backend's
        // commit/push split.
        let id = self.mint_commit_id();
        self.refs.lock().insert(format!("staged:{id}"), (id.clone(), files.clone()));
        Ok(id)
    }

    async fn push_ref(&self, ref_name: &str, commit: &str, expected_base: Option<&str>) -> Result<(), TicketsError> {
        if !ref_name.starts_with("refs/heads/") && !self.hidden_refs_supported {
            return Err(TicketsError::HiddenRefRejected(ref_name.to_string()));
        }
        let staged_key = format!("staged:{commit}");
        let mut refs = self.refs.lock();
        let tree = refs.get(&staged_key).map(|(_, tree)| tree.clone()).unwrap_or_default();
        let current = refs.get(ref_name).map(|(oid, _)| oid.clone());
        if current != expected_base.map(str::to_string) {
            return Err(TicketsError::NonFastForward(format!(
                "ref {ref_name} expected {expected_base:?} but found {current:?}"
            )));
        }
        refs.insert(ref_name.to_string(), (commit.to_string(), tree));
        Ok(())
    }
}
