// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Minimal compose-file parse: declared service names plus whether a
//! `x-hack` extension block is present (spec §4.6).

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ComposeDocument {
    #[serde(default)]
    services: BTreeMap<String, serde_yaml::Value>,
    #[serde(rename = "x-hack", default)]
    extensions: Option<serde_yaml::Value>,
}

/// Parsed result: declared service names (sorted) and whether the
/// `x-hack` extension block was present. `None` on any parse failure —
/// callers must never propagate this as an error (spec §4.6: "never throw").
pub fn parse_compose(yaml: &str) -> Option<(Vec<String>, bool)> {
    let doc: ComposeDocument = serde_yaml::from_str(yaml).ok()?;
    let services = doc.services.keys().cloned().collect();
    Some((services, doc.extensions.is_some()))
}
