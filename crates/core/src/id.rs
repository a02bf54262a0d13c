// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Opaque identifier newtypes.
//!
//! Every id is a prefixed UUIDv4 string (`job_xxxxxxxx-...`). The prefix is
//! purely diagnostic — equality and ordering only ever look at the full
//! string, so two ids with different prefixes are never equal by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! opaque_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh id.
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, uuid::Uuid::new_v4()))
            }

            /// Wrap an existing id string (e.g. one read back from storage).
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

opaque_id!(ProjectId, "proj");
opaque_id!(JobId, "job");
opaque_id!(ShellId, "shell");
opaque_id!(TokenId, "tok");
opaque_id!(TicketEventId, "evt");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = ProjectId::new();
        let b = ProjectId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("proj_"));
    }

    #[test]
    fn round_trips_through_serde() {
        let id = JobId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        let back: JobId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
    }
}
