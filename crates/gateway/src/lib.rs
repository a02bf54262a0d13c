// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! hack-gateway: token mint/verify, scopes, the `allowWrites` guardrail, and
//! the append-only audit log (spec §4.4).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod audit;
pub mod document;
pub mod error;
pub mod guard;
pub mod hashing;
pub mod store;

pub use audit::AuditLog;
pub use document::TokenDocument;
pub use error::GatewayError;
pub use guard::{decide, parse_bearer};
pub use hashing::{hash_secret, mint_secret, verify_secret, MintedSecret};
pub use store::TokenStore;
