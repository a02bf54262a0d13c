// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Shared harness for the end-to-end specs: spawn a real `hackd` subprocess
//! against an isolated state root, drive it over the socket and the HTTP
//! gateway, and tear it down when the test is done.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::net::UnixStream;

use hack_config::Paths;
use hack_core::{Scope, SystemClock};
use hack_gateway::TokenStore;
use hack_wire::{read_message, write_message, Request, Response};

/// How long a polling loop waits before giving up. Generous relative to the
/// actual work (a `/bin/echo` job, a socket round trip) because CI machines
/// are slower and noisier than a laptop.
pub const WAIT_MAX: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Poll `condition` until it returns `true` or `deadline` elapses, returning
/// whether it ever succeeded.
pub async fn wait_for<F, Fut>(deadline: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if condition().await {
            return true;
        }
        if start.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Bind an ephemeral port and immediately drop the listener, handing the
/// freed port to the spawned daemon. Racy in theory, fine in practice — the
/// same trick the teacher's own test fixtures use for per-test sockets.
fn free_tcp_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind an ephemeral port");
    listener.local_addr().expect("local addr").port()
}

/// Locate a workspace binary's build output directly rather than through
/// `assert_cmd`'s `CARGO_BIN_EXE_*` mechanism, which only covers binaries of
/// the package under test — `hackd` lives in a sibling package. This root
/// package's manifest dir is the workspace root, so its own `target/<profile>`
/// is also every member's output directory (the same assumption
/// `hack-cli::find_hackd_binary` makes about its own dev tree).
fn workspace_bin(name: &str) -> PathBuf {
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target").join(profile).join(name)
}

/// A `hackd` subprocess running against its own `$HOME/.hack`-equivalent
/// directory, killed on drop so a failing test never leaves an orphan.
pub struct TestDaemon {
    child: Child,
    _tmp: TempDir,
    pub paths: Paths,
    pub gateway_addr: String,
}

impl TestDaemon {
    pub async fn spawn(allow_writes: bool) -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp.path().join("hack.config.json");
        let paths = Paths::for_root(tmp.path().to_path_buf());
        let port = free_tcp_port();
        let gateway_addr = format!("127.0.0.1:{port}");

        let hackd = workspace_bin("hackd");
        let child = Command::new(&hackd)
            .env("HACK_GLOBAL_CONFIG_PATH", &config_path)
            .env("HACK_GATEWAY_ADDR", &gateway_addr)
            .env("HACK_ALLOW_WRITES", if allow_writes { "1" } else { "0" })
            .env("HACK_LOGGER", "")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn hackd");

        let daemon = Self { child, _tmp: tmp, paths, gateway_addr };

        let ready = wait_for(WAIT_MAX, || {
            let sock = daemon.paths.daemon_socket();
            async move { sock.exists() }
        })
        .await;
        assert!(ready, "hackd did not create its control socket in time");
        daemon
    }

    /// Mint a token directly against this daemon's on-disk token store. Safe
    /// to call while `hackd` is running: both sides take the same sidecar
    /// lock the teacher's registry store uses.
    pub fn mint_token(&self, scope: Scope) -> (String, String) {
        let store = TokenStore::new(self.paths.gateway_tokens(), self.paths.gateway_tokens_lock());
        let clock = SystemClock;
        let (token, plaintext) = store.with_lock(|doc| doc.mint(scope, None, &clock)).expect("mint token");
        (token.id.to_string(), plaintext)
    }

    pub fn gateway_url(&self, path: &str) -> String {
        format!("http://{}{}", self.gateway_addr, path)
    }

    pub async fn send(&self, request: &Request) -> Response {
        let mut stream = UnixStream::connect(self.paths.daemon_socket()).await.expect("connect control socket");
        write_message(&mut stream, request).await.expect("write request");
        read_message(&mut stream).await.expect("read response")
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[allow(dead_code)]
pub fn hack_bin() -> PathBuf {
    workspace_bin("hack")
}
