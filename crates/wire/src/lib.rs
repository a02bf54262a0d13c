// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! IPC and HTTP/WS wire protocol for the hack control plane.
//!
//! Wire format for the local Unix socket: 4-byte length prefix (big-endian)
//! + JSON payload. The HTTP/WS gateway reuses the same `Request`/`Response`
//! enums, serialized directly as JSON bodies / WS text frames.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod dto;
mod job_stream;
mod logs_ndjson;
mod request;
mod response;
mod session;
mod shell_stream;
mod socket;

pub use dto::{JobSummary, ProjectViewDto, ShellSummary};
pub use job_stream::{JobEventKind, JobStreamClientFrame, JobStreamServerFrame};
pub use logs_ndjson::LogEnvelope;
pub use request::Request;
pub use response::{PsEntry, Response};
pub use session::{is_valid_session_name, SessionCommand};
pub use shell_stream::{ShellClientFrame, ShellServerFrame, ShellSignal};
pub use socket::{decode, encode, read_message, write_message, ProtocolError};
