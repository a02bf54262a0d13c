// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! The HTTP/WS gateway (spec §4.1, §4.4): authenticated remote access to the
//! same `Router` the Unix socket serves. Bound to `127.0.0.1` by default.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::{get, post};
use axum::{Json, Router as AxumRouter};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use hack_core::{AuditRecord, JobId, ProjectId, ShellId, Token, TokenId};
use hack_gateway::{guard, AuditLog, GatewayError, TokenStore};
use hack_supervisor::bus::{JobEventKind as BusJobEventKind, JobUpdate};
use hack_wire::{
    JobEventKind as WireJobEventKind, JobStreamClientFrame, JobStreamServerFrame, Request, Response, ShellClientFrame,
    ShellServerFrame, ShellSignal,
};

use crate::error::DaemonError;
use crate::router::Router;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub tokens: Arc<TokenStore>,
    pub audit: Arc<AuditLog>,
    pub allow_writes: bool,
}

pub fn build(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/v1/status", get(status))
        .route("/v1/metrics", get(metrics))
        .route("/v1/projects", get(list_projects))
        .route("/v1/ps", get(ps))
        .route("/v1/projects/register", post(register_project))
        .route("/v1/projects/unregister", post(unregister_project))
        .route("/v1/projects/prune", post(prune_projects))
        .route("/v1/projects/:id/jobs", get(list_jobs).post(create_job))
        .route("/v1/projects/:id/jobs/:job_id", get(get_job))
        .route("/v1/projects/:id/jobs/:job_id/cancel", post(cancel_job))
        .route("/v1/projects/:id/jobs/:job_id/stream", get(job_stream))
        .route("/v1/projects/:id/shells", post(create_shell))
        .route("/v1/projects/:id/shells/:shell_id", get(get_shell))
        .route("/v1/projects/:id/shells/:shell_id/stream", get(shell_stream))
        .layer(middleware::from_fn_with_state(state.clone(), audit_layer))
        .with_state(state)
}

/// Records one audit line per request (spec §4.4). Runs outside auth so
/// even a `401`/`403` is logged; the token id is attached by the handler
/// via a response extension when authentication succeeded.
async fn audit_layer(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: Next,
) -> AxumResponse {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let token_id = response.extensions().get::<AuditTokenId>().and_then(|t| t.0.clone());
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let record = AuditRecord { timestamp_ms: now_ms(), token_id, method, path, status, duration_ms };
    if let Err(e) = state.audit.append(&record).await {
        tracing::warn!("failed to append audit record: {}", e);
    }
    response
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Clone)]
struct AuditTokenId(Option<TokenId>);

fn with_token_extension(mut response: AxumResponse, token_id: &TokenId) -> AxumResponse {
    response.extensions_mut().insert(AuditTokenId(Some(token_id.clone())));
    response
}

/// Extract and verify a bearer credential from either header spec §4.4
/// names, then apply the read/write scope decision for this request.
async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    method: &Method,
    is_shell_stream: bool,
) -> Result<Token, GatewayError> {
    let credential = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(guard::parse_bearer)
        .or_else(|| {
            headers
                .get("x-hack-token")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split_once('.'))
        })
        .map(|(id, secret)| (id.to_string(), secret.to_string()));

    let (id, secret) = credential.ok_or(GatewayError::MissingToken)?;
    let snapshot = state.tokens.snapshot()?;
    let token = snapshot.verify(&TokenId::from_string(id), &secret)?.clone();
    guard::decide(method.as_str(), is_shell_stream, &token, state.allow_writes)?;
    Ok(token)
}

fn error_response(e: &DaemonError) -> AxumResponse {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(Response::Error { code: e.code().to_string(), message: e.to_string(), retryable: e.retryable() }))
        .into_response()
}

fn gateway_error_response(e: GatewayError) -> AxumResponse {
    error_response(&DaemonError::Gateway(e))
}

// ---- plain GET endpoints ----

async fn status(State(state): State<AppState>) -> AxumResponse {
    dispatch_unauthenticated(&state, Request::Status).await
}

async fn metrics(State(state): State<AppState>) -> AxumResponse {
    dispatch_unauthenticated(&state, Request::Metrics).await
}

async fn dispatch_unauthenticated(state: &AppState, request: Request) -> AxumResponse {
    match state.router.dispatch(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct ListProjectsQuery {
    filter: Option<String>,
    #[serde(default)]
    include_global: bool,
    #[serde(default)]
    include_unregistered: bool,
}

async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListProjectsQuery>,
) -> AxumResponse {
    let token = match authenticate(&state, &headers, &Method::GET, false).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    let request = Request::ListProjects {
        filter: q.filter,
        include_global: q.include_global,
        include_unregistered: q.include_unregistered,
    };
    match state.router.dispatch(request).await {
        Ok(response) => with_token_extension(Json(response).into_response(), &token.id),
        Err(e) => with_token_extension(error_response(&e), &token.id),
    }
}

#[derive(Deserialize)]
struct PsQuery {
    compose_project: String,
    project: Option<String>,
    branch: Option<String>,
}

async fn ps(State(state): State<AppState>, headers: HeaderMap, Query(q): Query<PsQuery>) -> AxumResponse {
    let token = match authenticate(&state, &headers, &Method::GET, false).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    let request = Request::Ps { compose_project: q.compose_project, project: q.project, branch: q.branch };
    match state.router.dispatch(request).await {
        Ok(response) => with_token_extension(Json(response).into_response(), &token.id),
        Err(e) => with_token_extension(error_response(&e), &token.id),
    }
}

// ---- project registry mutations ----

#[derive(Deserialize)]
struct RegisterProjectBody {
    name: String,
    dev_host: String,
    repo_root: String,
    config_dir: String,
}

async fn register_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterProjectBody>,
) -> AxumResponse {
    handle_mutation(
        &state,
        &headers,
        Method::POST,
        false,
        Request::RegisterProject {
            name: body.name,
            dev_host: body.dev_host,
            repo_root: body.repo_root,
            config_dir: body.config_dir,
        },
    )
    .await
}

#[derive(Deserialize)]
struct UnregisterProjectBody {
    id: ProjectId,
}

async fn unregister_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UnregisterProjectBody>,
) -> AxumResponse {
    handle_mutation(&state, &headers, Method::POST, false, Request::UnregisterProject { id: body.id }).await
}

async fn prune_projects(State(state): State<AppState>, headers: HeaderMap) -> AxumResponse {
    handle_mutation(&state, &headers, Method::POST, false, Request::PruneProjects).await
}

/// Shared path for every write-gated endpoint: authenticate, enforce the
/// write-scope decision, dispatch, and stamp the audit token extension.
async fn handle_mutation(
    state: &AppState,
    headers: &HeaderMap,
    method: Method,
    is_shell_stream: bool,
    request: Request,
) -> AxumResponse {
    let token = match authenticate(state, headers, &method, is_shell_stream).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    match state.router.dispatch(request).await {
        Ok(response) => with_token_extension((StatusCode::CREATED, Json(response)).into_response(), &token.id),
        Err(e) => with_token_extension(error_response(&e), &token.id),
    }
}

// ---- jobs ----

#[derive(Deserialize)]
struct CreateJobBody {
    runner: String,
    command: Vec<String>,
    working_dir: String,
    #[serde(default)]
    env: HashMap<String, String>,
}

async fn create_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<CreateJobBody>,
) -> AxumResponse {
    handle_mutation(
        &state,
        &headers,
        Method::POST,
        false,
        Request::CreateJob {
            project_id,
            runner: body.runner,
            command: body.command,
            working_dir: body.working_dir,
            env: body.env,
        },
    )
    .await
}

async fn list_jobs(State(state): State<AppState>, headers: HeaderMap, Path(project_id): Path<ProjectId>) -> AxumResponse {
    let token = match authenticate(&state, &headers, &Method::GET, false).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    match state.router.dispatch(Request::ListJobs { project_id }).await {
        Ok(response) => with_token_extension(Json(response).into_response(), &token.id),
        Err(e) => with_token_extension(error_response(&e), &token.id),
    }
}

async fn get_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, job_id)): Path<(ProjectId, JobId)>,
) -> AxumResponse {
    let token = match authenticate(&state, &headers, &Method::GET, false).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    match state.router.dispatch(Request::GetJob { project_id, job_id }).await {
        Ok(response) => with_token_extension(Json(response).into_response(), &token.id),
        Err(e) => with_token_extension(error_response(&e), &token.id),
    }
}

async fn cancel_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, job_id)): Path<(ProjectId, JobId)>,
) -> AxumResponse {
    handle_mutation(&state, &headers, Method::POST, false, Request::CancelJob { project_id, job_id }).await
}

// ---- shells ----

#[derive(Deserialize)]
struct CreateShellBody {
    cols: u16,
    rows: u16,
    #[serde(default)]
    working_dir: Option<String>,
}

async fn create_shell(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<CreateShellBody>,
) -> AxumResponse {
    handle_mutation(
        &state,
        &headers,
        Method::POST,
        false,
        Request::CreateShell { project_id, cols: body.cols, rows: body.rows, working_dir: body.working_dir },
    )
    .await
}

async fn get_shell(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, shell_id)): Path<(ProjectId, ShellId)>,
) -> AxumResponse {
    let token = match authenticate(&state, &headers, &Method::GET, false).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    match state.router.dispatch(Request::GetShell { project_id, shell_id }).await {
        Ok(response) => with_token_extension(Json(response).into_response(), &token.id),
        Err(e) => with_token_extension(error_response(&e), &token.id),
    }
}

// ---- websocket streams ----

/// `426 upgrade_required` when the client hits a WS route without the
/// upgrade handshake headers (spec §4.4) — axum's extractor would otherwise
/// reject it with a generic `400`.
fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let has_upgrade = headers
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    let has_connection_upgrade = headers
        .get(axum::http::header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);
    has_upgrade && has_connection_upgrade
}

async fn job_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, job_id)): Path<(ProjectId, JobId)>,
    ws: WebSocketUpgrade,
) -> AxumResponse {
    if !is_upgrade_request(&headers) {
        return (StatusCode::from_u16(426).unwrap_or(StatusCode::BAD_REQUEST), "upgrade_required").into_response();
    }
    let token = match authenticate(&state, &headers, &Method::GET, false).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    let Some(entry) = state.router.jobs.get(&job_id) else {
        return error_response(&DaemonError::Supervisor(hack_supervisor::SupervisorError::JobNotFound(job_id.to_string())));
    };
    if entry.snapshot().project_id != project_id {
        return error_response(&DaemonError::Supervisor(hack_supervisor::SupervisorError::JobNotFound(job_id.to_string())));
    }
    let router = Arc::clone(&state.router);
    let response = ws.on_upgrade(move |socket| async move {
        let _guard = router.enter_stream();
        run_job_stream(socket, entry).await;
    });
    with_token_extension(response, &token.id)
}

/// While a subscriber is attached and idle (no log/event traffic), the bus
/// is expected to emit `job.heartbeat` carrying the current cursor every
/// `HEARTBEAT_IDLE` (spec §4.3). Implemented as a per-subscriber idle timer
/// here rather than inside `JobBus` itself, since only the stream loop knows
/// whether anything has actually gone out over the wire recently.
const HEARTBEAT_IDLE: std::time::Duration = std::time::Duration::from_secs(10);

async fn run_job_stream(mut socket: WebSocket, entry: Arc<hack_supervisor::JobEntry>) {
    let hello = match socket.recv().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str::<JobStreamClientFrame>(&text).ok(),
        _ => None,
    };
    let JobStreamClientFrame::Hello { logs_from, events_from } = hello.unwrap_or(JobStreamClientFrame::Hello {
        logs_from: 0,
        events_from: 0,
    });

    let (backlog, mut receiver) = entry.bus.subscribe(logs_from, events_from);
    if send_frame(&mut socket, &JobStreamServerFrame::Ready).await.is_err() {
        return;
    }
    for update in backlog {
        if !forward_job_update(&mut socket, update).await {
            return;
        }
    }

    let mut idle = Box::pin(tokio::time::sleep(HEARTBEAT_IDLE));
    loop {
        tokio::select! {
            update = receiver.recv() => {
                match update {
                    Ok(update) => {
                        idle.as_mut().reset(tokio::time::Instant::now() + HEARTBEAT_IDLE);
                        if !forward_job_update(&mut socket, update).await {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
            () = &mut idle => {
                idle.as_mut().reset(tokio::time::Instant::now() + HEARTBEAT_IDLE);
                let frame = JobStreamServerFrame::Heartbeat {
                    logs_offset: entry.bus.logs_offset(),
                    events_seq: entry.bus.events_seq(),
                };
                if send_frame(&mut socket, &frame).await.is_err() {
                    return;
                }
            }
        }
    }
    let _ = send_frame(&mut socket, &JobStreamServerFrame::End).await;
}

async fn forward_job_update(socket: &mut WebSocket, update: JobUpdate) -> bool {
    let frame = match update {
        JobUpdate::Log { offset, data } => {
            JobStreamServerFrame::Log { offset, data: String::from_utf8_lossy(&data).into_owned() }
        }
        JobUpdate::Event(event) => JobStreamServerFrame::Event {
            seq: event.seq,
            kind: wire_event_kind(event.kind),
            logs_offset: event.logs_offset,
            events_seq: event.seq,
        },
    };
    send_frame(socket, &frame).await.is_ok()
}

fn wire_event_kind(kind: BusJobEventKind) -> WireJobEventKind {
    match kind {
        BusJobEventKind::Created => WireJobEventKind::Created,
        BusJobEventKind::Started => WireJobEventKind::Started,
        BusJobEventKind::Stdout => WireJobEventKind::Stdout,
        BusJobEventKind::Stderr => WireJobEventKind::Stderr,
        BusJobEventKind::Completed => WireJobEventKind::Completed,
        BusJobEventKind::Failed => WireJobEventKind::Failed,
        BusJobEventKind::Canceled => WireJobEventKind::Canceled,
        BusJobEventKind::Heartbeat => WireJobEventKind::Heartbeat,
    }
}

async fn send_frame<T: Serialize>(socket: &mut WebSocket, frame: &T) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).unwrap_or_default();
    socket.send(Message::Text(text)).await
}

async fn shell_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((project_id, shell_id)): Path<(ProjectId, ShellId)>,
    ws: WebSocketUpgrade,
) -> AxumResponse {
    if !is_upgrade_request(&headers) {
        return (StatusCode::from_u16(426).unwrap_or(StatusCode::BAD_REQUEST), "upgrade_required").into_response();
    }
    // Shell streams are bidirectional and therefore always write-gated,
    // even though the HTTP verb upgrading the connection is GET.
    let token = match authenticate(&state, &headers, &Method::GET, true).await {
        Ok(t) => t,
        Err(e) => return gateway_error_response(e),
    };
    let Some(entry) = state.router.shells.get(&shell_id) else {
        return error_response(&DaemonError::Supervisor(hack_supervisor::SupervisorError::ShellNotFound(shell_id.to_string())));
    };
    if entry.snapshot().project_id != project_id {
        return error_response(&DaemonError::Supervisor(hack_supervisor::SupervisorError::ShellNotFound(shell_id.to_string())));
    }
    let router = Arc::clone(&state.router);
    let response = ws.on_upgrade(move |socket| async move {
        let _guard = router.enter_stream();
        run_shell_stream(socket, entry).await;
    });
    with_token_extension(response, &token.id)
}

async fn run_shell_stream(mut socket: WebSocket, entry: Arc<hack_supervisor::ShellEntry>) {
    let snapshot = entry.snapshot();
    let ready = ShellServerFrame::Ready {
        shell_id: snapshot.id.to_string(),
        cols: snapshot.cols,
        rows: snapshot.rows,
        cwd: snapshot.working_dir.clone(),
        shell: snapshot.shell_program.clone(),
        status: snapshot.status,
    };
    if send_frame(&mut socket, &ready).await.is_err() {
        return;
    }

    let mut output = entry.subscribe_output();
    loop {
        tokio::select! {
            chunk = output.recv() => {
                match chunk {
                    Ok(bytes) => {
                        let frame = ShellServerFrame::Output { data: String::from_utf8_lossy(&bytes).into_owned() };
                        if send_frame(&mut socket, &frame).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_shell_client_frame(&entry, &text) {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
        if entry.is_closed() {
            break;
        }
    }
    let exit = ShellServerFrame::Exit { exit_code: entry.exit_code(), signal: entry.last_signal() };
    let _ = send_frame(&mut socket, &exit).await;
}

/// Returns `false` when the client asked to close the stream.
fn handle_shell_client_frame(entry: &hack_supervisor::ShellEntry, text: &str) -> bool {
    match serde_json::from_str::<ShellClientFrame>(text) {
        Ok(ShellClientFrame::Hello { cols, rows }) => {
            let _ = entry.resize(cols, rows);
            true
        }
        Ok(ShellClientFrame::Input { data }) => {
            let _ = entry.send_input(data.into_bytes());
            true
        }
        Ok(ShellClientFrame::Resize { cols, rows }) => {
            let _ = entry.resize(cols, rows);
            true
        }
        Ok(ShellClientFrame::Signal { signal }) => {
            // The PTY has no direct child pid to kill(2); deliver the signal
            // the way a real terminal would, as the control byte the line
            // discipline turns into SIGINT/SIGQUIT for the foreground process.
            let byte: &[u8] = match signal {
                ShellSignal::Int => &[0x03],
                ShellSignal::Term => &[0x1c],
                ShellSignal::Kill => &[0x1c],
            };
            let _ = entry.send_input(byte.to_vec());
            true
        }
        Ok(ShellClientFrame::Close) => false,
        // Non-JSON text frames are treated as raw input (spec §4.3).
        Err(_) => {
            let _ = entry.send_input(text.as_bytes().to_vec());
            true
        }
    }
}
