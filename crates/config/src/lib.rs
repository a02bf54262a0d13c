// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! hack-config: paths, atomic writes, file locks, and dotted-path config.
//!
//! This crate is the leaf of the dependency order in SPEC_FULL.md §2: it
//! owns no domain logic, only the filesystem primitives every higher layer
//! builds its durability on.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod atomic;
pub mod dotted;
pub mod gitignore;
pub mod lock;
pub mod paths;

pub use atomic::atomic_write;
pub use dotted::{get_path, set_path, SetOutcome};
pub use lock::{FileLock, LockError};
pub use paths::Paths;
