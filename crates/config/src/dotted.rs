// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Dotted-path get/set over a `serde_json::Value` document (spec §4, §6).

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOutcome {
    pub changed: bool,
}

/// Read the value at a dot-separated path (`"gateway.port"`), or `None` if
/// any segment is missing.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, segment| node.get(segment))
}

/// Set the value at a dot-separated path, creating intermediate objects as
/// needed. Returns `changed: false` (and leaves `doc` untouched) when the
/// existing value already equals `value` — the idempotence law in spec §8.
pub fn set_path(doc: &mut Value, path: &str, value: Value) -> SetOutcome {
    if get_path(doc, path) == Some(&value) {
        return SetOutcome { changed: false };
    }

    let segments: Vec<&str> = path.split('.').collect();
    let mut node = doc;
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if !node.is_object() {
            *node = Value::Object(serde_json::Map::new());
        }
        let map = node.as_object_mut().expect("just coerced to object above");
        node = map.entry(segment.to_string()).or_insert_with(|| Value::Object(serde_json::Map::new()));
    }

    if let Some(&last) = segments.last() {
        if !node.is_object() {
            *node = Value::Object(serde_json::Map::new());
        }
        let map = node.as_object_mut().expect("just coerced to object above");
        map.insert(last.to_string(), value);
    }

    SetOutcome { changed: true }
}
