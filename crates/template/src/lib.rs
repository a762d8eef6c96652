//! Placeholder substitution for webhook URLs, headers, query params, and
//! bodies.
//!
//! Two placeholder forms, both literal string interpolation — never an
//! evaluated templating language, which is what keeps this module out of
//! the sandbox-escape surface:
//!
//! - `{{path}}` — a dotted path into the triggering object's properties,
//!   with `items[0]` array-index syntax. `__proto__`, `constructor`, and
//!   `prototype` are refused at any path position and resolve to empty.
//! - `[[inputN]]` — a 1-indexed reference into the action's configured
//!   input fields.

use serde_json::Value;

const MAX_PATH_DEPTH: usize = 20;
const BLOCKED_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Everything a substitution pass needs: the triggering object's
/// `properties` bag and the ordered input-field list.
pub struct TemplateContext<'a> {
    pub properties: &'a Value,
    pub inputs: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Replace every `{{path}}` and `[[inputN]]` placeholder in `text`.
/// Unresolvable placeholders (missing path, out-of-range input index,
/// blocked key) substitute as an empty string rather than erroring —
/// a malformed workflow shouldn't break every other placeholder in the
/// same string.
pub fn substitute(text: &str, ctx: &TemplateContext<'_>) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if let Some((value, consumed)) = try_match(text, i, "{{", "}}") {
            out.push_str(&resolve_property_path(ctx.properties, value));
            i += consumed;
        } else if let Some((value, consumed)) = try_match(text, i, "[[", "]]") {
            out.push_str(&resolve_input_ref(ctx.inputs, value));
            i += consumed;
        } else {
            let ch = text[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out
}

/// If `text[pos..]` starts with `open` and contains a matching `close`
/// before the next `open`, return the inner slice and the total bytes
/// consumed (including delimiters).
fn try_match<'a>(text: &'a str, pos: usize, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let rest = &text[pos..];
    let inner_start = rest.strip_prefix(open)?;
    let close_at = inner_start.find(close)?;
    let inner = &inner_start[..close_at];
    if inner.contains(open) {
        return None;
    }
    Some((inner, open.len() + inner.len() + close.len()))
}

fn resolve_input_ref(inputs: &[String], raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(n) = trimmed.strip_prefix("input") else {
        return String::new();
    };
    match n.parse::<usize>() {
        Ok(idx) if idx >= 1 => inputs.get(idx - 1).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn resolve_property_path(properties: &Value, raw: &str) -> String {
    let Some(segments) = parse_path(raw.trim()) else {
        return String::new();
    };
    if segments.len() > MAX_PATH_DEPTH {
        return String::new();
    }
    match walk(properties, &segments) {
        Some(v) => value_to_string(v),
        None => String::new(),
    }
}

fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    for dot_part in path.split('.') {
        let mut rest = dot_part;
        let key_end = rest.find('[').unwrap_or(rest.len());
        let key = &rest[..key_end];
        if !key.is_empty() {
            if BLOCKED_KEYS.contains(&key) {
                return None;
            }
            segments.push(Segment::Key(key.to_string()));
        }
        rest = &rest[key_end..];
        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']')?;
            let idx_str = &stripped[..close];
            let idx = idx_str.parse::<usize>().ok()?;
            segments.push(Segment::Index(idx));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}

fn walk<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k)?,
            (Segment::Index(i), Value::Array(arr)) => arr.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_simple_property_path() {
        let props = json!({"firstname": "Ada"});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(substitute("hello {{firstname}}", &ctx), "hello Ada");
    }

    #[test]
    fn substitutes_nested_path_and_array_index() {
        let props = json!({"user": {"items": ["a", "b", "c"]}});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(substitute("{{user.items[1]}}", &ctx), "b");
    }

    #[test]
    fn blocks_proto_traversal() {
        let props = json!({"__proto__": {"polluted": true}});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(substitute("{{__proto__.polluted}}", &ctx), "");
    }

    #[test]
    fn blocks_constructor_and_prototype_keys_mid_path() {
        let props = json!({"a": {"constructor": {"b": 1}}});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(substitute("{{a.constructor.b}}", &ctx), "");
    }

    #[test]
    fn missing_path_resolves_empty_without_erroring_other_placeholders() {
        let props = json!({"firstname": "Ada"});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(
            substitute("{{missing}} then {{firstname}}", &ctx),
            " then Ada"
        );
    }

    #[test]
    fn substitutes_numbered_inputs() {
        let props = json!({});
        let inputs = vec!["alpha".to_string(), "beta".to_string()];
        let ctx = TemplateContext { properties: &props, inputs: &inputs };
        assert_eq!(substitute("[[input1]]-[[input2]]", &ctx), "alpha-beta");
    }

    #[test]
    fn out_of_range_input_resolves_empty() {
        let props = json!({});
        let inputs = vec!["alpha".to_string()];
        let ctx = TemplateContext { properties: &props, inputs: &inputs };
        assert_eq!(substitute("[[input5]]", &ctx), "");
    }

    #[test]
    fn depth_beyond_cap_resolves_empty() {
        let mut path = String::from("a");
        for _ in 0..25 {
            path.push_str(".a");
        }
        let props = json!({"a": "leaf"});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(substitute(&format!("{{{{{path}}}}}"), &ctx), "");
    }

    #[test]
    fn literal_braces_without_valid_placeholder_pass_through() {
        let props = json!({});
        let ctx = TemplateContext { properties: &props, inputs: &[] };
        assert_eq!(substitute("just { braces } here", &ctx), "just { braces } here");
    }
}
