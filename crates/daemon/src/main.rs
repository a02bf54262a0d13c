// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! `hackd`: the control-plane daemon binary. Always runs in the foreground;
//! backgrounding (spec's `hack daemon start` vs `hack daemon foreground`) is
//! the CLI's job, via detached process spawn, not a fork inside this binary
//! (tokio's runtime and `fork()` don't mix safely once threads exist).

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use hack_core::SystemClock;
use hack_daemon::gateway::{self, AppState};
use hack_daemon::lifecycle;
use hack_gateway::{AuditLog, TokenStore};
use hack_registry::RegistryStore;
use hack_runtime::{CliRuntimeBackend, RuntimeCache};

const DEFAULT_GATEWAY_ADDR: &str = "127.0.0.1:47170";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("hackd exited with error: {}", e);
            ExitCode::from(70)
        }
    }
}

/// `HACK_LOGGER=json` selects structured output for log aggregation; any
/// other value (or unset) keeps the human-readable default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("HACK_LOGGER").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let paths = hack_config::Paths::resolve()?;
    std::fs::create_dir_all(paths.root())?;
    std::fs::create_dir_all(paths.gateway_dir())?;

    let clock: Arc<dyn hack_core::Clock> = Arc::new(SystemClock);
    let registry = Arc::new(RegistryStore::new(paths.projects_registry(), paths.registry_lock()));
    let runtime = Arc::new(RuntimeCache::new(Arc::new(CliRuntimeBackend::new()), Arc::clone(&registry), Arc::clone(&clock)));

    let startup = lifecycle::startup(paths.clone(), Arc::clone(&registry), Arc::clone(&runtime), Arc::clone(&clock)).await?;
    tracing::info!(socket = %paths.daemon_socket().display(), "hackd listening");

    let socket_listener = hack_daemon::SocketListener::new(startup.listener, Arc::clone(&startup.daemon.router));
    let socket_task = tokio::spawn(socket_listener.run());

    let tokens = Arc::new(TokenStore::new(paths.gateway_tokens(), paths.gateway_tokens_lock()));
    let audit = Arc::new(AuditLog::new(paths.gateway_audit_log()));
    let allow_writes = std::env::var("HACK_ALLOW_WRITES").map(|v| v != "0").unwrap_or(true);
    let state = AppState { router: Arc::clone(&startup.daemon.router), tokens, audit, allow_writes };
    let app = gateway::build(state);

    let gateway_addr: std::net::SocketAddr =
        std::env::var("HACK_GATEWAY_ADDR").unwrap_or_else(|_| DEFAULT_GATEWAY_ADDR.to_string()).parse()?;
    let gateway_listener = tokio::net::TcpListener::bind(gateway_addr).await?;
    tracing::info!(addr = %gateway_addr, "hackd gateway listening");
    let gateway_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(gateway_listener, app).await {
            tracing::error!("gateway server error: {}", e);
        }
    });

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received");

    socket_task.abort();
    gateway_task.abort();
    startup.daemon.shutdown().await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let term = signal(SignalKind::terminate());
    let int = signal(SignalKind::interrupt());
    let (mut term, mut int) = match (term, int) {
        (Ok(term), Ok(int)) => (term, int),
        _ => {
            tracing::error!("failed to install signal handlers, falling back to ctrl_c");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
