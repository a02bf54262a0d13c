// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! A thin client for the one-request-per-connection Unix socket protocol
//! (spec §4.1). No retry, no connection pooling — every command opens a
//! fresh connection, asks one thing, and closes.

use std::path::Path;

use thiserror::Error;
use tokio::net::UnixStream;

use hack_wire::{read_message, write_message, ProtocolError, Request, Response};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running")]
    NotRunning,
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("daemon returned an error: {message}")]
    Daemon { code: String, message: String, retryable: bool },
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning)
    }
}

pub struct DaemonClient {
    stream: UnixStream,
}

impl DaemonClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path).await.map_err(|_| ClientError::NotRunning)?;
        Ok(Self { stream })
    }

    /// Consumes the connection: the socket protocol is one request per
    /// connection, so there is nothing left to do with `self` afterward.
    pub async fn send(mut self, request: &Request) -> Result<Response, ClientError> {
        write_message(&mut self.stream, request).await?;
        let response: Response = read_message(&mut self.stream).await?;
        match response {
            Response::Error { code, message, retryable } => Err(ClientError::Daemon { code, message, retryable }),
            other => Ok(other),
        }
    }

    pub async fn status(socket_path: &Path) -> Result<Response, ClientError> {
        Self::connect(socket_path).await?.send(&Request::Status).await
    }
}
