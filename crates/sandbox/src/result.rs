//! Result shaping.
//!
//! A sandboxed execution always reduces to at most five named,
//! string-coerced `output_*` values: non-object returns become a single
//! `output_1`; object returns take their first five own properties, in
//! insertion order, each stringified with JS's loose `String(...)` rules
//! rather than `serde_json`'s `Display`.

use std::collections::BTreeMap;

use serde_json::Value;

/// Convert a sandbox return value into the `output_N` map the dispatcher
/// merges into `outputFields`. `max_fields` is the configured cap on how
/// many named, string-coercible values an execution may report.
pub fn shape_output(value: &Value, max_fields: usize) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    match value {
        Value::Object(map) => {
            for (i, (_, v)) in map.iter().enumerate().take(max_fields) {
                out.insert(format!("output_{}", i + 1), js_string_coerce(v));
            }
        }
        other => {
            out.insert("output_1".to_string(), js_string_coerce(other));
        }
    }
    out
}

/// Mirror JS's `String(x)` coercion closely enough for the result-shaping
/// rule: `undefined`/`null` become the literal `"undefined"`/`"null"`,
/// objects and arrays use JSON text rather than `[object Object]` (the
/// host never round-trips through `JSON.stringify` inside the sandbox, so
/// this is the host-side equivalent applied to the already-deep-copied
/// serde_json value pulled out of the engine).
fn js_string_coerce(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_return_becomes_output_1() {
        let out = shape_output(&json!(5), 5);
        assert_eq!(out.get("output_1"), Some(&"5".to_string()));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn object_return_takes_first_five_in_insertion_order() {
        let value = json!({"a": 1, "b": "two", "c": 3, "d": 4, "e": 5, "f": 6});
        let out = shape_output(&value, 5);
        assert_eq!(out.len(), 5);
        assert_eq!(out.get("output_1"), Some(&"1".to_string()));
        assert_eq!(out.get("output_2"), Some(&"two".to_string()));
        assert!(!out.contains_key("output_6"));
    }

    #[test]
    fn null_coerces_to_the_string_null() {
        let out = shape_output(&json!(null), 5);
        assert_eq!(out.get("output_1"), Some(&"null".to_string()));
    }
}
