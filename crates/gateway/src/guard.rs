// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! The gateway auth decision (spec §4.4), kept as a pure function over an
//! already-resolved token so it is unit-testable without a store or an HTTP
//! stack — the same shape as `hack_runtime::view::project_view`.

use hack_core::Token;

use crate::error::GatewayError;

/// Bearer tokens are carried as `<tokenId>.<secret>`; the id selects the
/// stored record, the secret is what gets hashed and compared.
pub fn parse_bearer(header_value: &str) -> Option<(&str, &str)> {
    let rest = header_value.strip_prefix("Bearer ")?;
    rest.split_once('.')
}

/// WebSocket subscribe-only streams (job logs, job events) are reachable
/// with `read` scope; shell streams and any mutation require `write`.
pub fn decide(method: &str, is_shell_stream: bool, token: &Token, allow_writes: bool) -> Result<(), GatewayError> {
    let is_safe = matches!(method, "GET" | "HEAD") && !is_shell_stream;
    if is_safe {
        return Ok(());
    }
    if !allow_writes {
        return Err(GatewayError::WritesDisabled);
    }
    if !token.scope.permits_write() {
        return Err(GatewayError::WriteScopeRequired);
    }
    Ok(())
}
