// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! `hack`: thin daemon-lifecycle CLI front for `hackd`. Everything else in
//! a full control-plane CLI (projects, jobs, shells, tickets) talks to the
//! daemon over the socket or HTTP/WS gateway directly; this binary only
//! starts, stops, and inspects the daemon process itself.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;

use std::path::PathBuf;
use std::process::{Command, ExitCode, Stdio};
use std::time::Duration;

use clap::{Parser, Subcommand};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use hack_config::paths::Paths;
use hack_daemon::lifecycle::{self, DaemonStatus, StaleReason};
use hack_wire::Response;

use client::DaemonClient;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const POLL_ATTEMPTS: u32 = 50;

#[derive(Parser)]
#[command(name = "hack", version, about = "Control-plane CLI for hackd")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the hackd daemon process
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Report whether the daemon is running, stopped, or stale
    Status,
    /// Remove a stale pid/socket left by a daemon that died uncleanly
    Clear,
    /// Stop the daemon (if running) and start it again
    Restart,
    /// Run the daemon in the foreground, inheriting this process's stdio
    Foreground,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let paths = match Paths::resolve() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(70);
        }
    };

    let result = match cli.command {
        Commands::Daemon { command } => run_daemon_command(command, &paths).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_daemon_command(command: DaemonCommand, paths: &Paths) -> anyhow::Result<()> {
    match command {
        DaemonCommand::Start => start(paths).await,
        DaemonCommand::Stop => stop(paths).await,
        DaemonCommand::Status => status(paths).await,
        DaemonCommand::Clear => clear(paths),
        DaemonCommand::Restart => restart(paths).await,
        DaemonCommand::Foreground => foreground(paths),
    }
}

async fn start(paths: &Paths) -> anyhow::Result<()> {
    if let DaemonStatus::Running { pid } = lifecycle::status(paths) {
        println!("Daemon already running (pid {})", pid);
        return Ok(());
    }

    let hackd_path = find_hackd_binary();
    std::fs::create_dir_all(paths.daemon_dir())?;
    let stdout = std::fs::File::create(paths.daemon_stdout_log())?;
    let stderr = std::fs::File::create(paths.daemon_stderr_log())?;
    Command::new(&hackd_path)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to spawn {}: {}", hackd_path.display(), e))?;

    for _ in 0..POLL_ATTEMPTS {
        if matches!(lifecycle::status(paths), DaemonStatus::Running { .. }) {
            println!("Daemon started");
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    anyhow::bail!("daemon did not come up in time; check {}", paths.daemon_stderr_log().display())
}

async fn stop(paths: &Paths) -> anyhow::Result<()> {
    let pid = match lifecycle::status(paths) {
        DaemonStatus::Running { pid } => pid,
        DaemonStatus::Stopped => {
            println!("Daemon not running");
            return Ok(());
        }
        DaemonStatus::Stale { .. } => {
            lifecycle::clear(paths)?;
            println!("Daemon not running (cleared stale state)");
            return Ok(());
        }
        DaemonStatus::Starting => anyhow::bail!("daemon is still starting"),
    };

    signal::kill(Pid::from_raw(pid), Signal::SIGTERM)
        .map_err(|e| anyhow::anyhow!("failed to signal pid {}: {}", pid, e))?;

    for _ in 0..POLL_ATTEMPTS {
        if matches!(lifecycle::status(paths), DaemonStatus::Stopped) {
            println!("Daemon stopped");
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    anyhow::bail!("daemon (pid {}) did not stop after SIGTERM", pid)
}

async fn status(paths: &Paths) -> anyhow::Result<()> {
    match DaemonClient::status(&paths.daemon_socket()).await {
        Ok(Response::Status { status, uptime_ms, version }) => {
            println!("Status: {}", status);
            println!("Version: {}", version);
            println!("Uptime: {}", format_uptime_ms(uptime_ms));
            Ok(())
        }
        Ok(other) => anyhow::bail!("unexpected response from daemon: {:?}", other),
        Err(e) if e.is_not_running() => {
            print_disk_status(paths);
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e),
    }
}

fn print_disk_status(paths: &Paths) {
    match lifecycle::status(paths) {
        DaemonStatus::Stopped => println!("Status: stopped"),
        DaemonStatus::Starting => println!("Status: starting"),
        DaemonStatus::Running { pid } => {
            println!("Status: running (pid {}), but the control socket is not answering", pid)
        }
        DaemonStatus::Stale { reason } => {
            let reason = match reason {
                StaleReason::PidNotRunning => "pid file present but the process is gone",
                StaleReason::SocketOnly => "socket file present but no pid file",
            };
            println!("Status: stale ({})", reason);
        }
    }
}

fn clear(paths: &Paths) -> anyhow::Result<()> {
    if matches!(lifecycle::status(paths), DaemonStatus::Running { .. }) {
        anyhow::bail!("refusing to clear: daemon is running");
    }
    lifecycle::clear(paths)?;
    println!("Cleared stale daemon state");
    Ok(())
}

async fn restart(paths: &Paths) -> anyhow::Result<()> {
    if matches!(lifecycle::status(paths), DaemonStatus::Running { .. }) {
        stop(paths).await?;
    }
    start(paths).await
}

fn foreground(paths: &Paths) -> anyhow::Result<()> {
    if let DaemonStatus::Running { pid } = lifecycle::status(paths) {
        anyhow::bail!("daemon already running (pid {})", pid);
    }
    let hackd_path = find_hackd_binary();
    let status = Command::new(&hackd_path)
        .status()
        .map_err(|e| anyhow::anyhow!("failed to exec {}: {}", hackd_path.display(), e))?;
    if !status.success() {
        anyhow::bail!("hackd exited with {}", status);
    }
    Ok(())
}

/// Prefer a sibling `hackd` next to this binary (same install layout), or a
/// debug build in the workspace target dir during development, falling
/// back to `PATH` lookup.
fn find_hackd_binary() -> PathBuf {
    let current_exe = std::env::current_exe().ok();
    let is_debug_build =
        current_exe.as_ref().and_then(|p| p.to_str()).map(|s| s.contains("target/debug")).unwrap_or(false);

    if is_debug_build {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let dev_path =
                PathBuf::from(manifest_dir).parent().and_then(|p| p.parent()).map(|p| p.join("target/debug/hackd"));
            if let Some(path) = dev_path {
                if path.exists() {
                    return path;
                }
            }
        }
    }

    if let Some(dir) = current_exe.as_ref().and_then(|exe| exe.parent()) {
        let sibling = dir.join("hackd");
        if sibling.exists() {
            return sibling;
        }
    }

    PathBuf::from("hackd")
}

fn format_uptime_ms(uptime_ms: u64) -> String {
    let secs = uptime_ms / 1000;
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_uptime_by_magnitude() {
        assert_eq!(format_uptime_ms(500), "0s");
        assert_eq!(format_uptime_ms(65_000), "1m 5s");
        assert_eq!(format_uptime_ms(3_725_000), "1h 2m 5s");
    }

    #[test]
    fn falls_back_to_path_lookup_outside_a_dev_tree() {
        // current_exe() in a test binary never lives under target/debug/hack,
        // so this should fall through to the bare-name PATH fallback.
        let path = find_hackd_binary();
        assert!(path == PathBuf::from("hackd") || path.ends_with("hackd"));
    }
}
