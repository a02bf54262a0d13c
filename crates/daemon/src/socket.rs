// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! The local Unix socket listener: one request per connection, framed per
//! `hack_wire::socket` (spec §4.1, §6). The socket is reachable only to
//! processes on the same host with filesystem access to it, so unlike the
//! HTTP/WS gateway it carries no bearer-token auth of its own.

use std::sync::Arc;

use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use hack_wire::{read_message, write_message, ProtocolError, Request, Response};

use crate::error::DaemonError;
use crate::router::Router;

pub struct SocketListener {
    listener: UnixListener,
    router: Arc<Router>,
}

impl SocketListener {
    pub fn new(listener: UnixListener, router: Arc<Router>) -> Self {
        Self { listener, router }
    }

    /// Accept connections until the process is torn down. Each connection
    /// is handled on its own task so one slow client never blocks another.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let router = Arc::clone(&self.router);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &router).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("unix accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        other => warn!("connection error: {}", other),
    }
}

async fn handle_connection(
    mut stream: tokio::net::UnixStream,
    router: &Router,
) -> Result<(), ProtocolError> {
    let request: Request = read_message(&mut stream).await?;
    info!(request = ?request, "received request");

    let response = match router.dispatch(request).await {
        Ok(response) => response,
        Err(e) => response_for_error(&e),
    };

    write_message(&mut stream, &response).await
}

fn response_for_error(e: &DaemonError) -> Response {
    Response::Error { code: e.code().to_string(), message: e.to_string(), retryable: e.retryable() }
}
