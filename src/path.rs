//! Dotted path resolution against the run context
//!
//! Supports:
//! - a.b.c (dot notation through mappings)
//!
//! Does NOT support:
//! - Array indexing: a[0] or a.0
//! - Wildcards or filters
//!
//! Descent happens through mappings only; any miss (absent key, non-mapping
//! intermediate, empty segment) yields `Value::Null`. Absence is a valid,
//! representable result, never an error.

use serde_json::{Map, Value};

/// Resolve a dotted path against a context mapping.
pub fn resolve(values: &Map<String, Value>, path: &str) -> Value {
    let mut segments = path.split('.');

    let first = match segments.next() {
        Some(s) if !s.is_empty() => s,
        _ => return Value::Null,
    };

    let mut current = match values.get(first) {
        Some(v) => v,
        None => return Value::Null,
    };

    for segment in segments {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => v,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }

    current.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn resolve_top_level_key() {
        let values = ctx(json!({"flag": true}));
        assert_eq!(resolve(&values, "flag"), json!(true));
    }

    #[test]
    fn resolve_nested_path() {
        let values = ctx(json!({"result": {"price": {"currency": "EUR"}}}));
        assert_eq!(resolve(&values, "result.price.currency"), json!("EUR"));
    }

    #[test]
    fn missing_key_yields_null() {
        let values = ctx(json!({"a": 1}));
        assert_eq!(resolve(&values, "b"), Value::Null);
        assert_eq!(resolve(&values, "a.b"), Value::Null);
    }

    #[test]
    fn non_mapping_intermediate_yields_null() {
        let values = ctx(json!({"a": [1, 2, 3], "s": "text"}));
        assert_eq!(resolve(&values, "a.0"), Value::Null);
        assert_eq!(resolve(&values, "s.len"), Value::Null);
    }

    #[test]
    fn empty_path_yields_null() {
        let values = ctx(json!({"a": 1}));
        assert_eq!(resolve(&values, ""), Value::Null);
        assert_eq!(resolve(&values, ".a"), Value::Null);
    }

    #[test]
    fn whole_mapping_can_be_resolved() {
        let values = ctx(json!({"result": {"success": false}}));
        assert_eq!(resolve(&values, "result"), json!({"success": false}));
    }
}
