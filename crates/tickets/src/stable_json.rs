// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Stable-stringify: recursively sort object keys before persisting a JSON
//! value, so two semantically equal events always serialize to the same
//! bytes (spec §4.7, §6 — "stable-stringified JSON with sorted keys").

use serde_json::{Map, Value};

/// Serialize `value` compactly with every object's keys sorted.
pub fn stable_stringify(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keys_serialize_in_sorted_order_regardless_of_insertion_order() {
        let a = json!({"b": 1, "a": 2, "c": 3});
        let b = json!({"c": 3, "a": 2, "b": 1});
        assert_eq!(stable_stringify(&a), stable_stringify(&b));
        assert_eq!(stable_stringify(&a), r#"{"a":2,"b":1,"c":3}"#);
    }

    #[test]
    fn nested_objects_are_sorted_recursively() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": 1});
        assert_eq!(stable_stringify(&value), r#"{"a":1,"z":{"x":2,"y":1}}"#);
    }

    #[test]
    fn arrays_preserve_order_but_sort_their_object_elements() {
        let value = json!([{"b": 1, "a": 2}, {"d": 3, "c": 4}]);
        assert_eq!(stable_stringify(&value), r#"[{"a":2,"b":1},{"c":4,"d":3}]"#);
    }
}
