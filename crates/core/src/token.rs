// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Gateway token and audit record data model (spec §3, §4.4).

use serde::{Deserialize, Serialize};

use crate::id::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Read,
    Write,
}

impl Scope {
    /// `read` permits only safe methods; `write` additionally permits
    /// mutations and shell streams.
    pub fn permits_write(self) -> bool {
        matches!(self, Scope::Write)
    }
}

/// A minted token. `secret_hash` is the only form ever persisted; the
/// plaintext secret is returned exactly once, at creation, and is never a
/// field of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub salt: String,
    pub secret_hash: String,
    pub scope: Scope,
    pub created_at_ms: i64,
    pub description: Option<String>,
}

/// One append-only line in `audit.jsonl`. Never carries a token secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp_ms: i64,
    pub token_id: Option<TokenId>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
}
